//! Backend selection and wiring from configuration

use crate::backend::{
    ConnectedBackend, ConnectedSettings, HardwareBackend, SimulatedBackend, SimulationTiming,
    TestBackend,
};
use crate::dispatcher::CommandDispatcher;
use crate::hardware::Hardware;
use crate::machine::MachineState;
use crate::zoom::SharedStepper;
use printscope_communication::{SerialSettings, SerialTransport};
use printscope_core::{Error, Result};
use printscope_settings::Config;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Backend variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HardwareMode {
    /// Kinematic simulator
    #[default]
    Simulated,
    /// No-op backend with a fixed delay
    Test,
    /// Real printer mainboard and zoom stepper
    Connected,
}

impl FromStr for HardwareMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simulated" | "sim" | "local" => Ok(Self::Simulated),
            "test" => Ok(Self::Test),
            "connected" | "hardware" => Ok(Self::Connected),
            other => Err(format!(
                "unknown hardware mode '{}', expected simulated, test or connected",
                other
            )),
        }
    }
}

impl fmt::Display for HardwareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simulated => write!(f, "simulated"),
            Self::Test => write!(f, "test"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// Build a [`Hardware`] facade for `mode` from a validated configuration
pub fn create_hardware(mode: HardwareMode, config: &Config) -> Result<Hardware> {
    config
        .validate()
        .map_err(|e| Error::other(format!("Invalid configuration: {}", e)))?;

    let machine = Arc::new(MachineState::new(config.zoom_optics()));
    let backend: Box<dyn HardwareBackend> = match mode {
        HardwareMode::Simulated => Box::new(SimulatedBackend::new(
            machine.clone(),
            SimulationTiming {
                tick: Duration::from_millis(config.simulation.tick_ms),
                zoom_speed_mm_s: config.zoom.sim_speed_mm_s,
                steps_per_mm: config.zoom.steps_per_mm,
            },
        )),
        HardwareMode::Test => Box::new(TestBackend::with_delay(
            machine.clone(),
            Duration::from_millis(config.simulation.test_delay_ms),
        )),
        HardwareMode::Connected => {
            let serial = SerialSettings::new(
                config.printer.serial_device.clone(),
                config.printer.baud_rate,
            );
            let transport =
                SerialTransport::new(serial).with_abort_flag(machine.emergency_flag());
            Box::new(ConnectedBackend::new(
                machine.clone(),
                Arc::new(transport),
                open_zoom_stepper(config),
                ConnectedSettings {
                    timeouts: config.timeouts(),
                    wake_delay: Duration::from_millis(config.printer.wake_delay_ms),
                    swap_yz: config.printer.swap_yz_axes,
                    steps_per_mm: config.zoom.steps_per_mm,
                    settle: Duration::from_millis(config.zoom.settle_delay_ms),
                },
            ))
        }
    };

    tracing::info!(mode = %mode, "Hardware backend created");
    Ok(Hardware::new(
        machine,
        backend,
        config.safety_limits(),
        config.zoom.steps_per_mm,
        config.zoom_homing_budget(),
    ))
}

#[cfg(feature = "gpio")]
fn open_zoom_stepper(config: &Config) -> Option<SharedStepper> {
    use crate::zoom::{GpioZoomStepper, ZoomStepper};

    match GpioZoomStepper::open(&config.zoom) {
        Ok(stepper) => {
            let stepper: Box<dyn ZoomStepper> = Box::new(stepper);
            Some(Arc::new(parking_lot::Mutex::new(stepper)))
        }
        Err(e) => {
            tracing::warn!("Zoom stepper unavailable: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "gpio"))]
fn open_zoom_stepper(_config: &Config) -> Option<SharedStepper> {
    tracing::warn!("Built without GPIO support; zoom commands will fail");
    None
}

impl CommandDispatcher {
    /// Dispatcher over `hardware` with history and feedrate from `config`
    pub fn from_config(hardware: Arc<Hardware>, config: &Config) -> Self {
        Self::new(
            hardware,
            config.history.capacity,
            config.printer.move_feedrate_default,
        )
    }
}
