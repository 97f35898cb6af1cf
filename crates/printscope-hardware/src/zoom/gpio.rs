//! Zoom stepper on Linux GPIO character devices

use super::{StepDirection, ZoomStepper};
use gpiod::{Chip, Input, Lines, Options, Output};
use printscope_core::{MotionError, Result};
use printscope_settings::ZoomSettings;
use std::thread;
use std::time::Duration;

const CONSUMER: &str = "printscope-zoom";

/// Step/direction driver wired to two output lines, home switch on an input
pub struct GpioZoomStepper {
    outputs: Lines<Output>,
    home_switch: Lines<Input>,
    pulse_delay: Duration,
    direction: bool,
}

impl GpioZoomStepper {
    /// Request the step, direction and home switch lines
    pub fn open(settings: &ZoomSettings) -> Result<Self> {
        let chip = Chip::new(&settings.gpio_chip)
            .map_err(|e| unavailable(format!("GPIO chip '{}': {}", settings.gpio_chip, e)))?;

        let outputs = chip
            .request_lines(
                Options::output([settings.step_line, settings.dir_line])
                    .values([false, false])
                    .consumer(CONSUMER),
            )
            .map_err(|e| unavailable(format!("step/dir lines: {}", e)))?;

        let home_switch = chip
            .request_lines(Options::input([settings.home_switch_line]).consumer(CONSUMER))
            .map_err(|e| unavailable(format!("home switch line: {}", e)))?;

        tracing::info!(
            chip = %settings.gpio_chip,
            step = settings.step_line,
            dir = settings.dir_line,
            home = settings.home_switch_line,
            "Zoom stepper lines requested"
        );

        Ok(Self {
            outputs,
            home_switch,
            pulse_delay: Duration::from_micros(settings.pulse_delay_us),
            direction: false,
        })
    }

    fn write(&mut self, step: bool) -> Result<()> {
        self.outputs
            .set_values([step, self.direction])
            .map_err(|e| unavailable(format!("GPIO write failed: {}", e)))
    }
}

impl ZoomStepper for GpioZoomStepper {
    fn set_direction(&mut self, direction: StepDirection) -> Result<()> {
        self.direction = direction == StepDirection::Extend;
        self.write(false)
    }

    fn pulse(&mut self) -> Result<()> {
        self.write(true)?;
        thread::sleep(self.pulse_delay);
        self.write(false)?;
        thread::sleep(self.pulse_delay);
        Ok(())
    }

    fn home_switch_triggered(&mut self) -> Result<bool> {
        let [closed] = self
            .home_switch
            .get_values([false; 1])
            .map_err(|e| unavailable(format!("GPIO read failed: {}", e)))?;
        Ok(closed)
    }

    fn release(&mut self) {
        if let Err(e) = self.outputs.set_values([false, false]) {
            tracing::warn!("Failed to reset zoom stepper outputs: {}", e);
        }
    }
}

fn unavailable(reason: String) -> printscope_core::Error {
    MotionError::HardwareUnavailable { reason }.into()
}
