//! # Printscope Communication
//!
//! Serial link to the printer mainboard.
//! Provides the line-oriented G-code request/acknowledgment transport and
//! the Marlin command encoding and response parsing used on top of it.

pub mod communication;
pub mod firmware;

pub use communication::{
    classify_line, list_ports, open_port, GcodeReply, GcodeTransport, LineChannel, LineClass,
    ReadWrite, SerialPortInfo, SerialSettings, SerialTransport,
};

pub use firmware::{
    FirmwareInfo, HeaterReading, MarlinCommand, MarlinCommandCreator, MarlinResponseParser,
    TemperatureReport,
};
