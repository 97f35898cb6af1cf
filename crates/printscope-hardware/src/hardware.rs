//! Hardware facade
//!
//! [`Hardware`] wraps one [`HardwareBackend`] and owns everything that must
//! behave the same regardless of backend: limit validation, the
//! emergency-stop gate, status transitions and the final position/zoom
//! bookkeeping. A command rejected here never reaches the backend and never
//! touches stored state.

use crate::backend::HardwareBackend;
use crate::machine::MachineState;
use printscope_communication::{FirmwareInfo, TemperatureReport};
use printscope_core::{
    CommandError, CommandKind, Error, MotionError, Position, Result, SafetyLimits, SystemStatus,
    TelemetryData, ZoomState,
};
use serde::Serialize;
use std::sync::Arc;

/// Outcome of [`Hardware::initialize`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitReport {
    /// Backend name
    pub backend: String,
    /// Whether the device link came up
    pub connected: bool,
    /// Whether pre-flight homing succeeded
    pub homed: bool,
    /// [`Hardware::is_ready`] after initialization
    pub ready: bool,
    /// Non-fatal problems encountered on the way
    pub warnings: Vec<String>,
}

/// What a validated command will do once the gate lets it through
enum Plan {
    Move { target: Position, feedrate: f64 },
    Home,
    Zoom { steps: i64, target_mm: f64 },
    HomeZoom,
}

/// Backend-independent hardware facade
pub struct Hardware {
    machine: Arc<MachineState>,
    backend: Box<dyn HardwareBackend>,
    limits: SafetyLimits,
    steps_per_mm: f64,
    homing_budget: u64,
}

impl Hardware {
    /// Wrap `backend`, which must act on the same `machine`
    pub fn new(
        machine: Arc<MachineState>,
        backend: Box<dyn HardwareBackend>,
        limits: SafetyLimits,
        steps_per_mm: f64,
        homing_budget: u64,
    ) -> Self {
        Self {
            machine,
            backend,
            limits,
            steps_per_mm,
            homing_budget,
        }
    }

    /// Shared machine state
    pub fn machine(&self) -> &Arc<MachineState> {
        &self.machine
    }

    /// Backend name
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Configured safe bounds
    pub fn limits(&self) -> &SafetyLimits {
        &self.limits
    }

    /// Bring the backend up and home the nozzle
    ///
    /// Never fails: problems are collected in the report and the system
    /// starts degraded.
    pub async fn initialize(&self) -> InitReport {
        let mut warnings = Vec::new();

        if let Err(e) = self.backend.initialize().await {
            tracing::error!(backend = self.backend.name(), "Initialization failed: {}", e);
            warnings.push(format!("initialization failed: {}", e));
            self.machine.record_fault(e.to_string());
        }

        let connected = self.backend.is_connected();
        let homed = if connected {
            match self.execute(&CommandKind::Home).await {
                Ok(_) => true,
                Err(e) => {
                    tracing::warn!("Pre-flight homing failed: {}", e);
                    warnings.push(format!("pre-flight homing failed: {}", e));
                    false
                }
            }
        } else {
            false
        };

        let report = InitReport {
            backend: self.backend.name().to_string(),
            connected,
            homed,
            ready: self.is_ready(),
            warnings,
        };
        tracing::info!(
            backend = %report.backend,
            connected = report.connected,
            homed = report.homed,
            ready = report.ready,
            "Hardware initialized"
        );
        report
    }

    /// Release the backend
    pub async fn shutdown(&self) -> Result<()> {
        self.backend.shutdown().await?;
        self.machine.set_status(SystemStatus::Idle);
        tracing::info!(backend = self.backend.name(), "Hardware shut down");
        Ok(())
    }

    /// Execute one command, returning the success message
    pub async fn execute(&self, kind: &CommandKind) -> Result<String> {
        match kind {
            CommandKind::EmergencyStop => {
                self.emergency_stop().await;
                return Ok("Emergency stop activated".to_string());
            }
            CommandKind::ClearEmergencyStop => {
                self.clear_emergency_stop();
                return Ok("Emergency stop cleared".to_string());
            }
            _ => {}
        }

        let outcome = match self.plan(kind) {
            Ok(plan) => self.run(kind, plan).await,
            Err(e) => Err(e),
        };
        self.finish(kind, &outcome);
        outcome
    }

    /// Validate a command against the limits, then the emergency gate
    fn plan(&self, kind: &CommandKind) -> Result<Plan> {
        let plan = match *kind {
            CommandKind::Move { x, y, z, feedrate } => Plan::Move {
                target: Position::new(x, y, z),
                feedrate,
            },
            CommandKind::MoveXy { x, y, feedrate } => {
                let held = self.machine.position();
                Plan::Move {
                    target: Position::new(x, y, held.z),
                    feedrate,
                }
            }
            CommandKind::MoveZ { z, feedrate } => {
                let held = self.machine.position();
                Plan::Move {
                    target: Position::new(held.x, held.y, z),
                    feedrate,
                }
            }
            CommandKind::Home => Plan::Home,
            CommandKind::ZoomIn { steps } => self.plan_zoom(steps)?,
            CommandKind::ZoomOut { steps } => self.plan_zoom(steps.saturating_neg())?,
            CommandKind::HomeZoom => Plan::HomeZoom,
            CommandKind::EmergencyStop | CommandKind::ClearEmergencyStop => {
                return Err(Error::internal(format!(
                    "'{}' is not a motion command",
                    kind.type_name()
                )))
            }
        };

        if let Plan::Move { target, feedrate } = &plan {
            self.limits.check_position(target)?;
            if !(feedrate.is_finite() && *feedrate > 0.0) {
                return Err(CommandError::InvalidParameters {
                    command_type: kind.type_name().to_string(),
                    reason: format!("feedrate must be > 0, got {feedrate}"),
                }
                .into());
            }
        }

        if kind.is_gated_by_emergency_stop() && self.machine.is_emergency_stopped() {
            return Err(MotionError::EmergencyStopActive.into());
        }

        Ok(plan)
    }

    fn plan_zoom(&self, steps: i64) -> Result<Plan> {
        let zoom = self.machine.zoom();
        if !zoom.is_homed {
            return Err(MotionError::ZoomNotHomed.into());
        }
        let target_mm = zoom.distance_mm + steps as f64 / self.steps_per_mm;
        self.limits.check_zoom(target_mm)?;
        Ok(Plan::Zoom { steps, target_mm })
    }

    async fn run(&self, kind: &CommandKind, plan: Plan) -> Result<String> {
        if let Some(busy) = kind.busy_status() {
            self.machine.set_status(busy);
        }

        match plan {
            Plan::Move { target, feedrate } => {
                self.backend.linear_move(target, feedrate).await?;
                self.machine.set_position(target);
                Ok(format!("Moved to {}", target))
            }
            Plan::Home => {
                self.backend.home_axes().await?;
                self.machine.set_position(Position::ORIGIN);
                Ok("Nozzle homed".to_string())
            }
            Plan::Zoom { steps, target_mm } => {
                self.machine.set_zoom_moving(true);
                let result = self.backend.step_zoom(steps).await;
                if result.is_ok() {
                    self.machine.set_zoom_distance(target_mm);
                }
                self.machine.set_zoom_moving(false);
                result?;
                let zoom = self.machine.zoom();
                Ok(format!(
                    "Zoom at {:.3}mm ({:.2}x, {:.1}%)",
                    zoom.distance_mm, zoom.magnification, zoom.percentage
                ))
            }
            Plan::HomeZoom => {
                self.machine.set_zoom_moving(true);
                let result = self.backend.seek_zoom_home(self.homing_budget).await;
                match &result {
                    Ok(()) => self.machine.mark_zoom_homed(),
                    Err(Error::Motion(MotionError::HomingTimeout { .. })) => {
                        self.machine.mark_zoom_unhomed()
                    }
                    Err(_) => {}
                }
                self.machine.set_zoom_moving(false);
                result?;
                Ok("Zoom homed".to_string())
            }
        }
    }

    fn finish(&self, kind: &CommandKind, outcome: &Result<String>) {
        match outcome {
            Ok(_) => {
                self.machine.clear_fault();
                self.machine.set_status(SystemStatus::Idle);
            }
            Err(e) if e.is_rejection() || e.is_emergency_stop() => {
                tracing::warn!(command = kind.type_name(), "Command rejected: {}", e);
                self.machine.set_status(SystemStatus::Idle);
            }
            Err(e) => {
                tracing::error!(command = kind.type_name(), "Command failed: {}", e);
                self.machine.record_fault(e.to_string());
            }
        }
    }

    /// Latch the emergency stop and halt the device
    ///
    /// Callable at any time, outside the command queue.
    pub async fn emergency_stop(&self) {
        if self.machine.raise_emergency() {
            tracing::warn!("Emergency stop activated");
        }
        if let Err(e) = self.backend.halt().await {
            tracing::warn!("Failed to send halt to device: {}", e);
        }
    }

    /// Release the emergency stop
    pub fn clear_emergency_stop(&self) {
        if self.machine.clear_emergency() {
            tracing::info!("Emergency stop cleared");
        }
    }

    /// Record a fault raised outside the backend, such as a panic
    pub fn record_fault(&self, message: impl Into<String>) {
        self.machine.record_fault(message);
    }

    /// Current status
    pub fn status(&self) -> SystemStatus {
        self.machine.status()
    }

    /// Point-in-time telemetry
    pub fn telemetry(&self) -> TelemetryData {
        self.machine.telemetry()
    }

    /// Whether commands can be expected to succeed
    pub fn is_ready(&self) -> bool {
        !self.machine.is_emergency_stopped()
            && self.machine.status().is_operational()
            && self.backend.is_connected()
    }

    /// Nozzle position snapshot
    pub fn nozzle_position(&self) -> Position {
        self.machine.position()
    }

    /// Zoom snapshot
    pub fn zoom_state(&self) -> ZoomState {
        self.machine.zoom()
    }

    /// Hotend and bed temperatures; `None` on timeout or parse failure
    pub async fn temperatures(&self) -> Option<TemperatureReport> {
        self.backend.query_temperatures().await
    }

    /// Firmware identity; `None` on timeout or parse failure
    pub async fn firmware_info(&self) -> Option<FirmwareInfo> {
        self.backend.query_firmware().await
    }

    /// Position as reported by the device, in the logical frame
    pub async fn reported_position(&self) -> Option<Position> {
        self.backend.query_position().await
    }
}
