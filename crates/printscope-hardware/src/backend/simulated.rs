//! Kinematic simulator
//!
//! Moves advance in fixed ticks along a straight line, taking as long as the
//! real gantry would at the commanded feedrate. The zoom actuator travels at
//! a fixed simulated speed. The emergency-stop flag is polled every tick.

use super::HardwareBackend;
use crate::machine::MachineState;
use async_trait::async_trait;
use printscope_communication::{FirmwareInfo, HeaterReading, TemperatureReport};
use printscope_core::{CommandError, MotionError, Position, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Feedrate of a simulated homing cycle, in mm/min
const HOMING_FEEDRATE: f64 = 3_000.0;

/// Reading reported for every heater
const AMBIENT_C: f64 = 22.0;

/// Simulation timing
#[derive(Debug, Clone, Copy)]
pub struct SimulationTiming {
    /// Interpolation tick
    pub tick: Duration,
    /// Zoom actuator speed in mm/s
    pub zoom_speed_mm_s: f64,
    /// Steps per mm of zoom extent
    pub steps_per_mm: f64,
}

/// Simulated backend
pub struct SimulatedBackend {
    machine: Arc<MachineState>,
    timing: SimulationTiming,
}

impl SimulatedBackend {
    /// Create a simulator acting on `machine`
    pub fn new(machine: Arc<MachineState>, timing: SimulationTiming) -> Self {
        Self { machine, timing }
    }

    /// Number of ticks an operation of `seconds` takes; at least one
    fn ticks_for(&self, seconds: f64) -> u64 {
        let tick = self.timing.tick.as_secs_f64();
        if seconds.is_finite() && seconds > 0.0 && tick > 0.0 {
            ((seconds / tick).ceil() as u64).max(1)
        } else {
            1
        }
    }

    /// Length of one tick of an operation lasting `seconds`
    ///
    /// Durations too long to represent are refused rather than simulated.
    fn tick_length(seconds: f64, ticks: u64, operation: &str) -> Result<Duration> {
        Duration::try_from_secs_f64(seconds.max(0.0))
            .and_then(|_| Duration::try_from_secs_f64(seconds.max(0.0) / ticks as f64))
            .map_err(|_| {
                CommandError::InvalidParameters {
                    command_type: operation.to_string(),
                    reason: format!("simulated {operation} would take {seconds}s"),
                }
                .into()
            })
    }

    fn check_emergency(&self, operation: &str) -> Result<()> {
        if self.machine.is_emergency_stopped() {
            tracing::warn!("Emergency stop during simulated {}", operation);
            return Err(MotionError::EmergencyStopDuringMotion {
                operation: operation.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn interpolate(&self, target: Position, feedrate: f64, operation: &str) -> Result<()> {
        let start = self.machine.position();
        let distance = start.distance_to(&target);
        let seconds = distance / feedrate * 60.0;
        let ticks = self.ticks_for(seconds);
        let tick = Self::tick_length(seconds, ticks, operation)?;

        tracing::debug!(
            from = %start,
            to = %target,
            seconds,
            ticks,
            "Simulating {}",
            operation
        );

        for i in 1..=ticks {
            self.check_emergency(operation)?;
            tokio::time::sleep(tick).await;
            self.machine
                .set_position(start.lerp(&target, i as f64 / ticks as f64));
        }
        Ok(())
    }

    async fn travel_zoom(&self, target_mm: f64, operation: &str) -> Result<()> {
        let start = self.machine.zoom().distance_mm;
        let seconds = (target_mm - start).abs() / self.timing.zoom_speed_mm_s;
        let ticks = self.ticks_for(seconds);
        let tick = Self::tick_length(seconds, ticks, operation)?;

        for i in 1..=ticks {
            self.check_emergency(operation)?;
            tokio::time::sleep(tick).await;
            let progress = i as f64 / ticks as f64;
            self.machine
                .set_zoom_distance(start + (target_mm - start) * progress);
        }
        Ok(())
    }
}

#[async_trait]
impl HardwareBackend for SimulatedBackend {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn initialize(&self) -> Result<()> {
        tracing::info!(tick_ms = self.timing.tick.as_millis() as u64, "Simulator ready");
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }

    async fn linear_move(&self, target: Position, feedrate: f64) -> Result<()> {
        self.interpolate(target, feedrate, "move").await
    }

    async fn home_axes(&self) -> Result<()> {
        self.interpolate(Position::ORIGIN, HOMING_FEEDRATE, "homing")
            .await
    }

    async fn step_zoom(&self, steps: i64) -> Result<()> {
        let start = self.machine.zoom().distance_mm;
        let target = start + steps as f64 / self.timing.steps_per_mm;
        self.travel_zoom(target, "zoom").await
    }

    async fn seek_zoom_home(&self, budget_steps: u64) -> Result<()> {
        let optics = *self.machine.optics();
        let needed = (self.machine.zoom().distance_mm - optics.min_extent_mm).max(0.0)
            * self.timing.steps_per_mm;
        if needed.ceil() as u64 > budget_steps {
            return Err(MotionError::HomingTimeout { budget_steps }.into());
        }
        self.travel_zoom(optics.min_extent_mm, "zoom homing").await
    }

    async fn halt(&self) -> Result<()> {
        tracing::warn!("Simulated halt");
        Ok(())
    }

    async fn query_temperatures(&self) -> Option<TemperatureReport> {
        let reading = HeaterReading {
            current: AMBIENT_C,
            target: Some(0.0),
        };
        Some(TemperatureReport {
            hotend: Some(reading),
            bed: Some(reading),
        })
    }

    async fn query_firmware(&self) -> Option<FirmwareInfo> {
        Some(FirmwareInfo {
            name: "Printscope".to_string(),
            version: Some(format!("{} simulated", env!("CARGO_PKG_VERSION"))),
            machine_type: Some("simulator".to_string()),
            fields: BTreeMap::new(),
        })
    }

    async fn query_position(&self) -> Option<Position> {
        Some(self.machine.position())
    }
}
