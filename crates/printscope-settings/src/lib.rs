//! Printscope Settings Crate
//!
//! Handles the hardware configuration: file loading and saving, validation,
//! and conversion into the core safety and optics types.

pub mod config;
pub mod error;

pub use config::{
    Config, HistorySettings, LensSettings, PrinterSettings, SafeLimits, SimulationSettings,
    TimeoutSettings, Timeouts, ZoomSettings,
};
pub use error::{SettingsError, SettingsResult};
