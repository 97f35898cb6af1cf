//! No-op backend for tests and UI development
//!
//! Every operation succeeds after a fixed delay (zero for instant) without
//! touching any device. The delay is interruptible by the emergency stop.

use super::{interruptible_sleep, HardwareBackend};
use crate::machine::MachineState;
use async_trait::async_trait;
use printscope_communication::{FirmwareInfo, TemperatureReport};
use printscope_core::{Position, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Emergency-stop polling interval while delaying
const POLL: Duration = Duration::from_millis(10);

/// Test backend
pub struct TestBackend {
    machine: Arc<MachineState>,
    delay: Duration,
}

impl TestBackend {
    /// Backend resolving every operation immediately
    pub fn instant(machine: Arc<MachineState>) -> Self {
        Self::with_delay(machine, Duration::ZERO)
    }

    /// Backend taking `delay` per operation
    pub fn with_delay(machine: Arc<MachineState>, delay: Duration) -> Self {
        Self { machine, delay }
    }

    async fn pretend(&self, operation: &str) -> Result<()> {
        tracing::debug!("Test backend: {}", operation);
        let flag = self.machine.emergency_flag();
        interruptible_sleep(self.delay, POLL, &flag, operation).await
    }
}

#[async_trait]
impl HardwareBackend for TestBackend {
    fn name(&self) -> &'static str {
        "test"
    }

    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }

    async fn linear_move(&self, _target: Position, _feedrate: f64) -> Result<()> {
        self.pretend("move").await
    }

    async fn home_axes(&self) -> Result<()> {
        self.pretend("homing").await
    }

    async fn step_zoom(&self, _steps: i64) -> Result<()> {
        self.pretend("zoom").await
    }

    async fn seek_zoom_home(&self, _budget_steps: u64) -> Result<()> {
        self.pretend("zoom homing").await
    }

    async fn halt(&self) -> Result<()> {
        Ok(())
    }

    async fn query_temperatures(&self) -> Option<TemperatureReport> {
        Some(TemperatureReport::default())
    }

    async fn query_firmware(&self) -> Option<FirmwareInfo> {
        Some(FirmwareInfo {
            name: "Printscope".to_string(),
            version: Some("test".to_string()),
            machine_type: None,
            fields: BTreeMap::new(),
        })
    }

    async fn query_position(&self) -> Option<Position> {
        Some(self.machine.position())
    }
}
