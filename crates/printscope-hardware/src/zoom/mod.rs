//! Zoom actuator stepper control
//!
//! The zoom actuator is a stepper driven by a step/direction driver with a
//! limit switch at its home (minimum extent) end. Pulse trains are blocking
//! and run on the blocking pool; the emergency-stop flag is polled before
//! every pulse, so the stop latency is one pulse period.

#[cfg(feature = "gpio")]
pub mod gpio;

use crate::machine::MachineState;
use printscope_core::{MotionError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "gpio")]
pub use gpio::GpioZoomStepper;

/// Direction of travel along the optical axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    /// Longer extent, higher magnification
    Extend,
    /// Shorter extent, towards the home switch
    Retract,
}

impl StepDirection {
    /// Direction for a signed step count
    pub fn of(steps: i64) -> Self {
        if steps >= 0 {
            Self::Extend
        } else {
            Self::Retract
        }
    }

    /// Extent change per step, in steps
    pub fn sign(&self) -> f64 {
        match self {
            Self::Extend => 1.0,
            Self::Retract => -1.0,
        }
    }
}

/// Step/direction stepper with a home switch
///
/// Implementations block; call them from a blocking context only.
pub trait ZoomStepper: Send {
    /// Set the direction output
    fn set_direction(&mut self, direction: StepDirection) -> Result<()>;

    /// Emit one step pulse, including its high and low time
    fn pulse(&mut self) -> Result<()>;

    /// Whether the home switch is closed
    fn home_switch_triggered(&mut self) -> Result<bool>;

    /// Release the outputs
    fn release(&mut self) {}
}

/// Shared handle to a stepper
pub type SharedStepper = Arc<parking_lot::Mutex<Box<dyn ZoomStepper>>>;

/// Pulse train parameters
#[derive(Debug, Clone, Copy)]
pub struct StepPlan {
    /// Signed step count
    pub steps: i64,
    /// Steps per mm of extent
    pub steps_per_mm: f64,
    /// Pause after the train
    pub settle: Duration,
}

/// Run a pulse train, updating the zoom extent after every pulse
///
/// On emergency stop the extent is left at the partial progress reached.
pub fn run_steps(
    stepper: &mut dyn ZoomStepper,
    machine: &MachineState,
    emergency: &AtomicBool,
    plan: StepPlan,
) -> Result<()> {
    let direction = StepDirection::of(plan.steps);
    let start = machine.zoom().distance_mm;
    stepper.set_direction(direction)?;

    for done in 1..=plan.steps.unsigned_abs() {
        if emergency.load(Ordering::SeqCst) {
            tracing::warn!(done = done - 1, total = plan.steps, "Zoom stepping interrupted");
            return Err(MotionError::EmergencyStopDuringMotion {
                operation: "zoom".to_string(),
            }
            .into());
        }
        stepper.pulse()?;
        machine.set_zoom_distance(start + direction.sign() * done as f64 / plan.steps_per_mm);
    }

    if !plan.settle.is_zero() {
        std::thread::sleep(plan.settle);
    }
    Ok(())
}

/// Step towards the home switch until it closes or `budget_steps` is spent
///
/// Returns the number of steps taken.
pub fn seek_home(
    stepper: &mut dyn ZoomStepper,
    emergency: &AtomicBool,
    budget_steps: u64,
) -> Result<u64> {
    stepper.set_direction(StepDirection::Retract)?;

    let mut taken = 0;
    loop {
        if stepper.home_switch_triggered()? {
            tracing::debug!(steps = taken, "Zoom home switch reached");
            return Ok(taken);
        }
        if taken >= budget_steps {
            return Err(MotionError::HomingTimeout { budget_steps }.into());
        }
        if emergency.load(Ordering::SeqCst) {
            return Err(MotionError::EmergencyStopDuringMotion {
                operation: "zoom homing".to_string(),
            }
            .into());
        }
        stepper.pulse()?;
        taken += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use printscope_core::{Error, ZoomOptics};

    /// Stepper whose home switch closes after a fixed number of retract steps
    struct FakeStepper {
        direction: Option<StepDirection>,
        pulses: u64,
        switch_after: Option<u64>,
        raise_after: Option<(u64, Arc<AtomicBool>)>,
    }

    impl FakeStepper {
        fn new(switch_after: Option<u64>) -> Self {
            Self {
                direction: None,
                pulses: 0,
                switch_after,
                raise_after: None,
            }
        }
    }

    impl ZoomStepper for FakeStepper {
        fn set_direction(&mut self, direction: StepDirection) -> Result<()> {
            self.direction = Some(direction);
            Ok(())
        }

        fn pulse(&mut self) -> Result<()> {
            self.pulses += 1;
            if let Some((after, flag)) = &self.raise_after {
                if self.pulses >= *after {
                    flag.store(true, Ordering::SeqCst);
                }
            }
            Ok(())
        }

        fn home_switch_triggered(&mut self) -> Result<bool> {
            Ok(self.switch_after.is_some_and(|n| self.pulses >= n))
        }
    }

    fn machine() -> MachineState {
        let machine = MachineState::new(ZoomOptics::new(50.0, 50.0, 150.0));
        machine.mark_zoom_homed();
        machine
    }

    fn plan(steps: i64) -> StepPlan {
        StepPlan {
            steps,
            steps_per_mm: 10.0,
            settle: Duration::ZERO,
        }
    }

    #[test]
    fn test_run_steps_pulses_and_tracks_extent() {
        let machine = machine();
        let flag = AtomicBool::new(false);
        let mut stepper = FakeStepper::new(None);

        run_steps(&mut stepper, &machine, &flag, plan(25)).unwrap();
        assert_eq!(stepper.pulses, 25);
        assert_eq!(stepper.direction, Some(StepDirection::Extend));
        assert!((machine.zoom().distance_mm - 52.5).abs() < 1e-9);
    }

    #[test]
    fn test_negative_steps_retract() {
        let machine = machine();
        machine.set_zoom_distance(100.0);
        let flag = AtomicBool::new(false);
        let mut stepper = FakeStepper::new(None);

        run_steps(&mut stepper, &machine, &flag, plan(-100)).unwrap();
        assert_eq!(stepper.direction, Some(StepDirection::Retract));
        assert!((machine.zoom().distance_mm - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_emergency_stop_freezes_partial_progress() {
        let machine = machine();
        let flag = Arc::new(AtomicBool::new(false));
        let mut stepper = FakeStepper::new(None);
        stepper.raise_after = Some((4, flag.clone()));

        let err = run_steps(&mut stepper, &machine, &flag, plan(50)).unwrap_err();
        assert!(err.is_emergency_stop());
        assert_eq!(stepper.pulses, 4);
        assert!((machine.zoom().distance_mm - 50.4).abs() < 1e-9);
    }

    #[test]
    fn test_seek_home_stops_at_switch() {
        let flag = AtomicBool::new(false);
        let mut stepper = FakeStepper::new(Some(30));
        assert_eq!(seek_home(&mut stepper, &flag, 1000).unwrap(), 30);
        assert_eq!(stepper.direction, Some(StepDirection::Retract));
    }

    #[test]
    fn test_seek_home_budget_is_bounded() {
        let flag = AtomicBool::new(false);
        let mut stepper = FakeStepper::new(None);
        match seek_home(&mut stepper, &flag, 80) {
            Err(Error::Motion(MotionError::HomingTimeout { budget_steps })) => {
                assert_eq!(budget_steps, 80)
            }
            other => panic!("expected homing timeout, got {other:?}"),
        }
        assert_eq!(stepper.pulses, 80);
    }
}
