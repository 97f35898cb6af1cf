//! Error handling for Printscope
//!
//! Provides error types for every layer of the hardware stack:
//! - Motion errors (safety limits, emergency stop, homing)
//! - Transport errors (serial link, G-code acknowledgment protocol)
//! - Command errors (unknown types, malformed parameters)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Motion error type
///
/// Raised by the actuator drivers before or during physical actuation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotionError {
    /// Target nozzle position is outside the configured safe bounds
    #[error("Position outside safe limits: X:{x:.3} Y:{y:.3} Z:{z:.3}")]
    LimitViolation {
        /// Requested X coordinate in mm.
        x: f64,
        /// Requested Y coordinate in mm.
        y: f64,
        /// Requested Z coordinate in mm.
        z: f64,
    },

    /// Target zoom extent is outside the configured travel
    #[error("Zoom position outside limits: {extent_mm:.3}mm")]
    ZoomLimitViolation {
        /// Requested actuator extent in mm.
        extent_mm: f64,
    },

    /// A motion command arrived while the emergency stop is latched
    #[error("Emergency stop active")]
    EmergencyStopActive,

    /// The emergency stop was raised while an operation was in progress
    #[error("Emergency stop during {operation}")]
    EmergencyStopDuringMotion {
        /// The interrupted operation.
        operation: String,
    },

    /// Zoom stepping requested before the zoom actuator was homed
    #[error("Zoom not homed")]
    ZoomNotHomed,

    /// The home switch never triggered within the step budget
    #[error("Zoom homing timeout: home switch not reached within {budget_steps} steps")]
    HomingTimeout {
        /// Maximum number of steps that were issued.
        budget_steps: u64,
    },

    /// The actuator or device needed for the operation is not available
    #[error("Hardware unavailable: {reason}")]
    HardwareUnavailable {
        /// Why the hardware cannot be used.
        reason: String,
    },
}

/// Transport error type
///
/// Represents failures of the line-oriented G-code exchange with the
/// microcontroller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// No terminal line arrived before the deadline
    #[error("Timeout waiting for '{command}' after {timeout_ms}ms ({})", describe_received(.received))]
    Timeout {
        /// The command line that was sent.
        command: String,
        /// The deadline in milliseconds.
        timeout_ms: u64,
        /// Non-terminal lines received before the deadline.
        received: Vec<String>,
    },

    /// The device answered with an error or resend token
    #[error("Printer error for '{command}': {line}")]
    Device {
        /// The command line that was sent.
        command: String,
        /// The offending response line.
        line: String,
    },

    /// The exchange was abandoned because the emergency stop was raised
    #[error("Exchange for '{command}' aborted by emergency stop")]
    Aborted {
        /// The command line that was sent.
        command: String,
    },

    /// The serial link is not open
    #[error("Serial link not open")]
    NotConnected,

    /// Failed to open the serial device
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The device path.
        port: String,
        /// The reason the device failed to open.
        reason: String,
    },

    /// I/O error on the link
    #[error("I/O error: {reason}")]
    Io {
        /// The reason for the I/O error.
        reason: String,
    },
}

fn describe_received(received: &[String]) -> String {
    if received.is_empty() {
        "no response received".to_string()
    } else {
        format!("no 'ok' received, responses: {}", received.join("; "))
    }
}

/// Command error type
///
/// Represents requests that cannot be turned into an executable command.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    /// The command type is not part of the command set
    #[error("Unknown command type: {command_type}")]
    UnknownCommandType {
        /// The unrecognised command type.
        command_type: String,
    },

    /// The parameters do not match the command type
    #[error("Invalid parameters for '{command_type}': {reason}")]
    InvalidParameters {
        /// The command type.
        command_type: String,
        /// What is wrong with the parameters.
        reason: String,
    },
}

/// Coarse error classification surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Position or zoom extent outside configured bounds
    LimitViolation,
    /// Motion requested while the emergency stop is latched
    EmergencyStopActive,
    /// No terminal response within the deadline
    ProtocolTimeout,
    /// Device reported an error or resend token
    ProtocolError,
    /// Command type not recognised
    UnknownCommandType,
    /// Parameters missing, malformed or unusable for the command type
    InvalidParameters,
    /// Transport or device not open
    HardwareUnavailable,
    /// Unexpected failure during execution
    InternalFault,
}

/// Main error type for Printscope
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Motion error
    #[error(transparent)]
    Motion(#[from] MotionError),

    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Command error
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected fault during execution
    #[error("Internal fault: {0}")]
    Internal(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Create an internal fault
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Motion(MotionError::LimitViolation { .. })
            | Error::Motion(MotionError::ZoomLimitViolation { .. })
            | Error::Motion(MotionError::ZoomNotHomed) => ErrorKind::LimitViolation,
            Error::Motion(MotionError::EmergencyStopActive)
            | Error::Motion(MotionError::EmergencyStopDuringMotion { .. })
            | Error::Transport(TransportError::Aborted { .. }) => ErrorKind::EmergencyStopActive,
            Error::Motion(MotionError::HomingTimeout { .. })
            | Error::Transport(TransportError::Timeout { .. }) => ErrorKind::ProtocolTimeout,
            Error::Transport(TransportError::Device { .. }) => ErrorKind::ProtocolError,
            Error::Command(CommandError::UnknownCommandType { .. }) => {
                ErrorKind::UnknownCommandType
            }
            Error::Motion(MotionError::HardwareUnavailable { .. })
            | Error::Transport(TransportError::NotConnected)
            | Error::Transport(TransportError::FailedToOpen { .. })
            | Error::Transport(TransportError::Io { .. })
            | Error::Io(_) => ErrorKind::HardwareUnavailable,
            Error::Command(CommandError::InvalidParameters { .. }) => {
                ErrorKind::InvalidParameters
            }
            Error::Internal(_) | Error::Other(_) => ErrorKind::InternalFault,
        }
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::ProtocolTimeout
    }

    /// Check if the command was refused before any actuation happened
    ///
    /// Rejections leave the machine untouched and do not move the system
    /// into the error state.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::Motion(MotionError::LimitViolation { .. })
                | Error::Motion(MotionError::ZoomLimitViolation { .. })
                | Error::Motion(MotionError::ZoomNotHomed)
                | Error::Motion(MotionError::EmergencyStopActive)
                | Error::Command(_)
        )
    }

    /// Check if this error was caused by the emergency stop
    pub fn is_emergency_stop(&self) -> bool {
        self.kind() == ErrorKind::EmergencyStopActive
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
