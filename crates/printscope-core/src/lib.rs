//! # Printscope Core
//!
//! Core types and utilities for Printscope.
//! Provides the data model shared by every hardware backend, the safety
//! limit checker, the command model, machine events, and the error hierarchy.

pub mod command;
pub mod data;
pub mod error;
pub mod event;
pub mod limits;

pub use command::{Command, CommandId, CommandKind, CommandRequest};

pub use data::{
    CommandAck, CommandStatus, Position, SystemStatus, TelemetryData, ZoomOptics, ZoomState,
};

pub use error::{CommandError, Error, ErrorKind, MotionError, Result, TransportError};

pub use event::{EventDispatcher, MachineEvent};

pub use limits::{AxisRange, SafetyLimits};
