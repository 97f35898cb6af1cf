//! Hardware backends
//!
//! A backend performs actuation only. Safety checks, the emergency-stop gate
//! and status transitions live in [`Hardware`](crate::Hardware) so every
//! backend rejects the same commands the same way.
//!
//! Backends may update position and zoom while an operation is in progress
//! so telemetry can follow it; the facade writes the exact final value once
//! the operation succeeds.

pub mod connected;
pub mod simulated;
pub mod test_double;

use async_trait::async_trait;
use printscope_communication::{FirmwareInfo, TemperatureReport};
use printscope_core::{MotionError, Position, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub use connected::{ConnectedBackend, ConnectedSettings};
pub use simulated::{SimulatedBackend, SimulationTiming};
pub use test_double::TestBackend;

/// Actuation capability set shared by every backend
#[async_trait]
pub trait HardwareBackend: Send + Sync {
    /// Short backend name for logs and reports
    fn name(&self) -> &'static str;

    /// Bring the device up
    async fn initialize(&self) -> Result<()>;

    /// Release the device
    async fn shutdown(&self) -> Result<()>;

    /// Whether the device link is up
    fn is_connected(&self) -> bool;

    /// Straight-line nozzle move to `target` at `feedrate` mm/min
    async fn linear_move(&self, target: Position, feedrate: f64) -> Result<()>;

    /// Home all nozzle axes
    async fn home_axes(&self) -> Result<()>;

    /// Step the zoom actuator by a signed step count
    async fn step_zoom(&self, steps: i64) -> Result<()>;

    /// Drive the zoom actuator onto its home switch within `budget_steps`
    async fn seek_zoom_home(&self, budget_steps: u64) -> Result<()>;

    /// Immediate halt after the emergency stop was raised
    async fn halt(&self) -> Result<()>;

    /// Hotend and bed temperatures
    async fn query_temperatures(&self) -> Option<TemperatureReport>;

    /// Firmware identity
    async fn query_firmware(&self) -> Option<FirmwareInfo>;

    /// Position as reported by the device
    async fn query_position(&self) -> Option<Position>;
}

/// Sleep for `total`, in slices of at most `slice`, polling the emergency flag
pub(crate) async fn interruptible_sleep(
    total: Duration,
    slice: Duration,
    emergency: &AtomicBool,
    operation: &str,
) -> Result<()> {
    let mut remaining = total;
    loop {
        if emergency.load(Ordering::SeqCst) {
            return Err(MotionError::EmergencyStopDuringMotion {
                operation: operation.to_string(),
            }
            .into());
        }
        if remaining.is_zero() {
            return Ok(());
        }
        let step = remaining.min(slice);
        tokio::time::sleep(step).await;
        remaining -= step;
    }
}
