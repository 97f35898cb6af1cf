//! # Printscope
//!
//! Remote control of a modified 3D-printer gantry carrying a camera, and of
//! the stepper-driven zoom actuator behind its lens.
//!
//! ## Architecture
//!
//! Printscope is organized as a workspace with multiple crates:
//!
//! 1. **printscope-core** - Data model, safety limits, command model, events, errors
//! 2. **printscope-communication** - Serial G-code transport, Marlin encoding and parsing
//! 3. **printscope-settings** - Configuration file handling and validation
//! 4. **printscope-hardware** - Backends, safety gate, command dispatcher
//! 5. **printscope** - Headless daemon integrating all crates
//!
//! ## Backends
//!
//! - **simulated**: kinematic simulator, moves take as long as the real gantry
//! - **test**: no-op backend resolving instantly or after a fixed delay
//! - **connected**: Marlin mainboard over serial, zoom stepper on GPIO

pub use printscope_communication::{list_ports, SerialPortInfo};
pub use printscope_core::{
    CommandAck, CommandId, CommandKind, CommandRequest, CommandStatus, Error, MachineEvent,
    Position, Result, SafetyLimits, SystemStatus, TelemetryData, ZoomState,
};
pub use printscope_hardware::{
    create_hardware, CommandDispatcher, Hardware, HardwareMode, InitReport, QueueStatus,
};
pub use printscope_settings::Config;

use tokio::sync::broadcast::{self, error::RecvError};

/// Forward every resolved ack to `emit` until the event channel closes
///
/// A subscriber that falls behind skips the events it missed and keeps
/// going. Returns the number of acks forwarded.
pub async fn forward_acks<F>(mut events: broadcast::Receiver<MachineEvent>, mut emit: F) -> usize
where
    F: FnMut(&CommandAck),
{
    let mut forwarded = 0;
    loop {
        match events.recv().await {
            Ok(MachineEvent::CommandResolved(ack)) => {
                emit(&ack);
                forwarded += 1;
            }
            Ok(_) => {}
            Err(RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "Ack forwarder fell behind, events skipped");
            }
            Err(RecvError::Closed) => break,
        }
    }
    forwarded
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// Sets up structured logging with:
/// - Pretty console output, or one JSON object per line when `json` is set
/// - RUST_LOG environment variable support, INFO when unset
/// - Targets, thread names and line numbers
pub fn init_logging(json: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stdout)
                    .with_target(true)
                    .with_current_span(false),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stdout)
                    .with_target(true)
                    .with_level(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .pretty(),
            )
            .try_init()
    };

    installed.map_err(|e| anyhow::anyhow!("failed to install log subscriber: {}", e))
}
