//! Configuration for Printscope
//!
//! Provides configuration file handling and validation.
//! Supports JSON and TOML file formats.
//!
//! Configuration is organized into logical sections:
//! - Printer link and nozzle safety limits
//! - Zoom actuator travel and stepper wiring
//! - Lens optics
//! - Per-command-class timeouts
//! - Simulation timing
//! - Command history retention
//!
//! Every field has a default, so a partial file only overrides what it names.

use crate::error::{SettingsError, SettingsResult};
use printscope_core::{AxisRange, SafetyLimits, ZoomOptics};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Nozzle safe position bounds in mm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafeLimits {
    /// Minimum X
    pub x_min: f64,
    /// Maximum X
    pub x_max: f64,
    /// Minimum Y
    pub y_min: f64,
    /// Maximum Y
    pub y_max: f64,
    /// Minimum Z
    pub z_min: f64,
    /// Maximum Z
    pub z_max: f64,
}

impl Default for SafeLimits {
    fn default() -> Self {
        Self {
            x_min: 0.0,
            x_max: 220.0,
            y_min: 0.0,
            y_max: 220.0,
            z_min: 0.0,
            z_max: 250.0,
        }
    }
}

/// Printer link settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterSettings {
    /// Serial device path
    pub serial_device: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Wait after opening the port; most mainboards reset on connect
    pub wake_delay_ms: u64,
    /// Exchange Y and Z on the wire
    pub swap_yz_axes: bool,
    /// Feedrate in mm/min for moves that do not specify one
    pub move_feedrate_default: f64,
    /// Nozzle safe bounds
    pub safe_limits: SafeLimits,
}

impl Default for PrinterSettings {
    fn default() -> Self {
        Self {
            serial_device: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            wake_delay_ms: 3_000,
            swap_yz_axes: false,
            move_feedrate_default: 1_500.0,
            safe_limits: SafeLimits::default(),
        }
    }
}

/// Zoom actuator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomSettings {
    /// Extent at the home switch, in mm
    #[serde(alias = "min_s_prime")]
    pub min_extent_mm: f64,
    /// Longest extent, in mm
    #[serde(alias = "max_s_prime")]
    pub max_extent_mm: f64,
    /// Stepper steps per mm of extent
    pub steps_per_mm: f64,
    /// GPIO character device
    pub gpio_chip: String,
    /// Step output line offset
    #[serde(alias = "step_pin")]
    pub step_line: u32,
    /// Direction output line offset
    #[serde(alias = "dir_pin")]
    pub dir_line: u32,
    /// Home switch input line offset
    #[serde(alias = "home_switch_pin")]
    pub home_switch_line: u32,
    /// Half period of one step pulse, in µs
    pub pulse_delay_us: u64,
    /// Pause after a pulse train, in ms
    pub settle_delay_ms: u64,
    /// Simulated actuator speed, in mm/s
    pub sim_speed_mm_s: f64,
}

impl Default for ZoomSettings {
    fn default() -> Self {
        Self {
            min_extent_mm: 50.0,
            max_extent_mm: 150.0,
            steps_per_mm: 80.0,
            gpio_chip: "/dev/gpiochip0".to_string(),
            step_line: 17,
            dir_line: 27,
            home_switch_line: 22,
            pulse_delay_us: 500,
            settle_delay_ms: 50,
            sim_speed_mm_s: 2.0,
        }
    }
}

/// Lens settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LensSettings {
    /// Focal length in mm
    #[serde(alias = "focal_length")]
    pub focal_length_mm: f64,
}

impl Default for LensSettings {
    fn default() -> Self {
        Self {
            focal_length_mm: 50.0,
        }
    }
}

/// Per-command-class deadlines, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    /// Linear moves
    pub move_s: f64,
    /// Homing
    pub home_s: f64,
    /// Temperature, position and firmware queries
    pub query_s: f64,
    /// Unit and mode setup at initialization
    pub setup_s: f64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            move_s: 30.0,
            home_s: 60.0,
            query_s: 5.0,
            setup_s: 2.0,
        }
    }
}

/// Simulation timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Interpolation tick of the simulated backend, in ms
    pub tick_ms: u64,
    /// Fixed delay per command of the test backend, in ms
    pub test_delay_ms: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            test_delay_ms: 100,
        }
    }
}

/// Command history retention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Maximum number of acknowledgments kept
    pub capacity: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { capacity: 1_000 }
    }
}

/// Deadlines handed to the transport, by command class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Linear moves
    pub motion: Duration,
    /// Homing
    pub homing: Duration,
    /// Queries
    pub query: Duration,
    /// Initialization setup commands
    pub setup: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        TimeoutSettings::default().to_timeouts()
    }
}

impl TimeoutSettings {
    /// Convert to durations
    pub fn to_timeouts(&self) -> Timeouts {
        Timeouts {
            motion: seconds(self.move_s),
            homing: seconds(self.home_s),
            query: seconds(self.query_s),
            setup: seconds(self.setup_s),
        }
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

/// Complete hardware configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Printer link and nozzle limits
    pub printer: PrinterSettings,
    /// Zoom actuator
    pub zoom: ZoomSettings,
    /// Lens optics
    pub lens: LensSettings,
    /// Deadlines
    pub timeouts: TimeoutSettings,
    /// Simulation timing
    pub simulation: SimulationSettings,
    /// History retention
    pub history: HistorySettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config file location, `<config dir>/printscope/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("printscope").join("config.toml"))
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::LoadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let config: Self = match Format::of(path)? {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        let printer = &self.printer;
        if printer.serial_device.trim().is_empty() {
            return Err(SettingsError::invalid(
                "printer.serial_device",
                "must not be empty",
            ));
        }

        if printer.baud_rate == 0 {
            return Err(SettingsError::invalid("printer.baud_rate", "must be > 0"));
        }

        if !(printer.move_feedrate_default > 0.0) {
            return Err(SettingsError::invalid(
                "printer.move_feedrate_default",
                "must be > 0",
            ));
        }

        let limits = &printer.safe_limits;
        for (axis, min, max) in [
            ("x", limits.x_min, limits.x_max),
            ("y", limits.y_min, limits.y_max),
            ("z", limits.z_min, limits.z_max),
        ] {
            if !(min.is_finite() && max.is_finite() && min <= max) {
                return Err(SettingsError::invalid(
                    format!("printer.safe_limits.{axis}"),
                    format!("min ({min}) must not exceed max ({max})"),
                ));
            }
        }

        let zoom = &self.zoom;
        if !(zoom.min_extent_mm.is_finite()
            && zoom.max_extent_mm.is_finite()
            && zoom.min_extent_mm < zoom.max_extent_mm)
        {
            return Err(SettingsError::invalid(
                "zoom.max_extent_mm",
                "must be greater than zoom.min_extent_mm",
            ));
        }

        if !(zoom.steps_per_mm > 0.0) {
            return Err(SettingsError::invalid("zoom.steps_per_mm", "must be > 0"));
        }

        if !(zoom.sim_speed_mm_s > 0.0) {
            return Err(SettingsError::invalid("zoom.sim_speed_mm_s", "must be > 0"));
        }

        if !(self.lens.focal_length_mm > 0.0) {
            return Err(SettingsError::invalid("lens.focal_length_mm", "must be > 0"));
        }

        let timeouts = &self.timeouts;
        for (key, value) in [
            ("timeouts.move_s", timeouts.move_s),
            ("timeouts.home_s", timeouts.home_s),
            ("timeouts.query_s", timeouts.query_s),
            ("timeouts.setup_s", timeouts.setup_s),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(SettingsError::invalid(key, "must be > 0"));
            }
        }

        if self.simulation.tick_ms == 0 {
            return Err(SettingsError::invalid("simulation.tick_ms", "must be > 0"));
        }

        if self.history.capacity == 0 {
            return Err(SettingsError::invalid("history.capacity", "must be > 0"));
        }

        Ok(())
    }

    /// Safe bounds for the nozzle and the zoom actuator
    pub fn safety_limits(&self) -> SafetyLimits {
        let limits = &self.printer.safe_limits;
        SafetyLimits {
            x: AxisRange::new(limits.x_min, limits.x_max),
            y: AxisRange::new(limits.y_min, limits.y_max),
            z: AxisRange::new(limits.z_min, limits.z_max),
            zoom: AxisRange::new(self.zoom.min_extent_mm, self.zoom.max_extent_mm),
        }
    }

    /// Optics of the zoom assembly
    pub fn zoom_optics(&self) -> ZoomOptics {
        ZoomOptics::new(
            self.lens.focal_length_mm,
            self.zoom.min_extent_mm,
            self.zoom.max_extent_mm,
        )
    }

    /// Transport deadlines
    pub fn timeouts(&self) -> Timeouts {
        self.timeouts.to_timeouts()
    }

    /// Step budget for zoom homing: full travel times steps per mm
    pub fn zoom_homing_budget(&self) -> u64 {
        let travel = self.zoom.max_extent_mm - self.zoom.min_extent_mm;
        (travel * self.zoom.steps_per_mm).ceil().max(0.0) as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            other => Err(SettingsError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.printer.move_feedrate_default, 1500.0);
        assert_eq!(config.timeouts().homing, Duration::from_secs(60));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let mut config = Config::default();
        config.printer.safe_limits.y_min = 300.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("safe_limits.y"));
    }

    #[test]
    fn test_zoom_travel_must_be_positive() {
        let mut config = Config::default();
        config.zoom.max_extent_mm = config.zoom.min_extent_mm;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let mut config = Config::default();
        config.history.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_homing_budget() {
        let mut config = Config::default();
        config.zoom.min_extent_mm = 50.0;
        config.zoom.max_extent_mm = 150.0;
        config.zoom.steps_per_mm = 2.5;
        assert_eq!(config.zoom_homing_budget(), 250);
    }

    #[test]
    fn test_conversions() {
        let config = Config::default();
        let limits = config.safety_limits();
        assert_eq!(limits.x.max, 220.0);
        assert_eq!(limits.zoom.min, 50.0);

        let optics = config.zoom_optics();
        assert_eq!(optics.magnification(100.0), 1.0);
    }
}
