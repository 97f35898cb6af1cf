//! Physically connected backend
//!
//! Nozzle motion goes to a Marlin mainboard over the G-code transport. The
//! zoom actuator is a stepper on local GPIO; without one, zoom commands fail
//! with `HardwareUnavailable` while nozzle control keeps working.

use super::HardwareBackend;
use crate::machine::MachineState;
use crate::zoom::{run_steps, seek_home, SharedStepper, StepPlan};
use async_trait::async_trait;
use printscope_communication::{
    FirmwareInfo, GcodeTransport, MarlinCommand, MarlinCommandCreator, MarlinResponseParser,
    TemperatureReport,
};
use printscope_core::{Error, MotionError, Position, Result};
use printscope_settings::Timeouts;
use std::sync::Arc;
use std::time::Duration;

/// Connected backend settings
#[derive(Debug, Clone, Copy)]
pub struct ConnectedSettings {
    /// Transport deadlines by command class
    pub timeouts: Timeouts,
    /// Wait after opening the link before the first command
    pub wake_delay: Duration,
    /// Exchange Y and Z on the wire
    pub swap_yz: bool,
    /// Steps per mm of zoom extent
    pub steps_per_mm: f64,
    /// Pause after a zoom pulse train
    pub settle: Duration,
}

/// Connected backend
pub struct ConnectedBackend {
    machine: Arc<MachineState>,
    transport: Arc<dyn GcodeTransport>,
    stepper: Option<SharedStepper>,
    commands: MarlinCommandCreator,
    parser: MarlinResponseParser,
    settings: ConnectedSettings,
}

impl ConnectedBackend {
    /// Create a backend; nothing is opened until [`initialize`](HardwareBackend::initialize)
    pub fn new(
        machine: Arc<MachineState>,
        transport: Arc<dyn GcodeTransport>,
        stepper: Option<SharedStepper>,
        settings: ConnectedSettings,
    ) -> Self {
        Self {
            machine,
            transport,
            stepper,
            commands: MarlinCommandCreator::new(settings.swap_yz),
            parser: MarlinResponseParser::new(),
            settings,
        }
    }

    fn stepper(&self) -> Result<SharedStepper> {
        self.stepper.clone().ok_or_else(|| {
            MotionError::HardwareUnavailable {
                reason: "no zoom stepper configured".to_string(),
            }
            .into()
        })
    }

    async fn query(&self, command: MarlinCommand) -> Option<String> {
        match self
            .transport
            .send_and_await(command.as_str(), self.settings.timeouts.query)
            .await
        {
            Ok(reply) => Some(reply.text()),
            Err(e) => {
                tracing::debug!(command = %command, "Query failed: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl HardwareBackend for ConnectedBackend {
    fn name(&self) -> &'static str {
        "connected"
    }

    async fn initialize(&self) -> Result<()> {
        self.transport.open().await?;

        if !self.settings.wake_delay.is_zero() {
            tracing::info!(
                "Waiting {}ms for the controller to reset",
                self.settings.wake_delay.as_millis()
            );
            tokio::time::sleep(self.settings.wake_delay).await;
        }

        match self.transport.discard_input().await {
            Ok(banner) => {
                for line in banner {
                    tracing::debug!(line = %line, "Startup output");
                }
            }
            Err(e) => tracing::warn!("Failed to clear startup output: {}", e),
        }

        for command in MarlinCommand::setup_sequence() {
            if let Err(e) = self
                .transport
                .send_and_await(command.as_str(), self.settings.timeouts.setup)
                .await
            {
                tracing::warn!(command = %command, "Setup command failed: {}", e);
            }
        }

        tracing::info!("Printer link initialized");
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        if let Some(stepper) = self.stepper.clone() {
            tokio::task::spawn_blocking(move || stepper.lock().release())
                .await
                .map_err(|e| Error::internal(format!("zoom release failed: {}", e)))?;
        }
        self.transport.close().await?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.transport.is_open()
    }

    async fn linear_move(&self, target: Position, feedrate: f64) -> Result<()> {
        let line = self.commands.linear_move(&target, feedrate);
        self.transport
            .send_and_await(&line, self.settings.timeouts.motion)
            .await?;
        Ok(())
    }

    async fn home_axes(&self) -> Result<()> {
        self.transport
            .send_and_await(
                MarlinCommand::HomeAll.as_str(),
                self.settings.timeouts.homing,
            )
            .await?;
        Ok(())
    }

    async fn step_zoom(&self, steps: i64) -> Result<()> {
        let stepper = self.stepper()?;
        let machine = self.machine.clone();
        let plan = StepPlan {
            steps,
            steps_per_mm: self.settings.steps_per_mm,
            settle: self.settings.settle,
        };

        tokio::task::spawn_blocking(move || {
            let flag = machine.emergency_flag();
            let mut stepper = stepper.lock();
            run_steps(&mut **stepper, &machine, &flag, plan)
        })
        .await
        .map_err(|e| Error::internal(format!("zoom worker failed: {}", e)))?
    }

    async fn seek_zoom_home(&self, budget_steps: u64) -> Result<()> {
        let stepper = self.stepper()?;
        let flag = self.machine.emergency_flag();

        let taken = tokio::task::spawn_blocking(move || {
            let mut stepper = stepper.lock();
            seek_home(&mut **stepper, &flag, budget_steps)
        })
        .await
        .map_err(|e| Error::internal(format!("zoom worker failed: {}", e)))??;

        tracing::info!(steps = taken, budget = budget_steps, "Zoom homed");
        Ok(())
    }

    async fn halt(&self) -> Result<()> {
        self.transport
            .send_unacknowledged(MarlinCommand::EmergencyStop.as_str())
            .await?;
        Ok(())
    }

    async fn query_temperatures(&self) -> Option<TemperatureReport> {
        let text = self.query(MarlinCommand::ReportTemperatures).await?;
        self.parser.parse_temperatures(&text)
    }

    async fn query_firmware(&self) -> Option<FirmwareInfo> {
        let text = self.query(MarlinCommand::FirmwareInfo).await?;
        self.parser.parse_firmware_info(&text)
    }

    async fn query_position(&self) -> Option<Position> {
        let text = self.query(MarlinCommand::ReportPosition).await?;
        let reported = self.parser.parse_position(&text)?;
        Some(self.commands.to_logical(&reported))
    }
}
