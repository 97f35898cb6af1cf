//! # Printscope Hardware
//!
//! Hardware layer for the gantry and the zoom actuator.
//! Provides the shared machine state, the three interchangeable backends
//! (simulated, test, connected), the backend-independent safety gate in
//! [`Hardware`], and the FIFO [`CommandDispatcher`] with its bounded history.

pub mod backend;
pub mod dispatcher;
pub mod factory;
pub mod hardware;
pub mod history;
pub mod machine;
pub mod zoom;

pub use backend::{
    ConnectedBackend, ConnectedSettings, HardwareBackend, SimulatedBackend, SimulationTiming,
    TestBackend,
};
pub use dispatcher::{CommandDispatcher, QueueStatus, DEFAULT_HISTORY_LIMIT};
pub use factory::{create_hardware, HardwareMode};
pub use hardware::{Hardware, InitReport};
pub use history::{CommandHistory, DEFAULT_HISTORY_CAPACITY};
pub use machine::MachineState;
pub use zoom::{run_steps, seek_home, SharedStepper, StepDirection, StepPlan, ZoomStepper};

#[cfg(feature = "gpio")]
pub use zoom::GpioZoomStepper;
