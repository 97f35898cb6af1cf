//! Firmware dialects
//!
//! Supported controllers:
//! - Marlin: the stock firmware of most consumer FDM printers

pub mod marlin;

pub use marlin::{
    FirmwareInfo, HeaterReading, MarlinCommand, MarlinCommandCreator, MarlinResponseParser,
    TemperatureReport,
};
