//! Marlin firmware support
//!
//! Marlin answers every command line with `ok` once it has been processed,
//! interleaving `echo:` and `busy:` lines while long operations run.

pub mod command_creator;
pub mod response_parser;

pub use command_creator::{MarlinCommand, MarlinCommandCreator};
pub use response_parser::{FirmwareInfo, HeaterReading, MarlinResponseParser, TemperatureReport};
