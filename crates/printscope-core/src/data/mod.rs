//! Data models for positions, status, and command results
//!
//! This module provides:
//! - Nozzle position tracking in millimeters
//! - Zoom actuator state with derived optics
//! - System status state machine values
//! - Command acknowledgments and telemetry snapshots

pub mod zoom;

use crate::command::CommandId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use zoom::{ZoomOptics, ZoomState};

/// Nozzle position in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// X-axis position
    pub x: f64,
    /// Y-axis position
    pub y: f64,
    /// Z-axis position
    pub z: f64,
}

impl Position {
    /// The homed origin
    pub const ORIGIN: Position = Position {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Create a new position with X, Y, Z coordinates
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Straight-line distance to another position
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Linear interpolation towards `target`; `t` is clamped to `[0, 1]`
    ///
    /// `t = 1` yields `target` bit for bit.
    pub fn lerp(&self, target: &Position, t: f64) -> Position {
        let t = t.clamp(0.0, 1.0);
        if t >= 1.0 {
            return *target;
        }
        Position {
            x: self.x + (target.x - self.x) * t,
            y: self.y + (target.y - self.y) * t,
            z: self.z + (target.z - self.z) * t,
        }
    }

    /// Same position with Y and Z exchanged
    pub fn swapped_yz(&self) -> Position {
        Position {
            x: self.x,
            y: self.z,
            z: self.y,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X:{:.3} Y:{:.3} Z:{:.3}", self.x, self.y, self.z)
    }
}

/// Overall system status
///
/// Exactly one value is active at a time for a hardware instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemStatus {
    /// Ready and accepting commands
    #[default]
    Idle,
    /// A motion or zoom command is executing
    Moving,
    /// A homing cycle is executing
    Homing,
    /// The last actuation failed
    Error,
    /// Emergency stop latched; only an explicit clear leaves this state
    EmergencyStop,
}

impl SystemStatus {
    /// Whether new commands can be expected to run
    pub fn is_operational(&self) -> bool {
        !matches!(self, SystemStatus::Error | SystemStatus::EmergencyStop)
    }
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Moving => write!(f, "moving"),
            Self::Homing => write!(f, "homing"),
            Self::Error => write!(f, "error"),
            Self::EmergencyStop => write!(f, "emergency_stop"),
        }
    }
}

/// Resolution state of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandStatus {
    /// Queued, not yet resolved
    #[serde(rename = "pending")]
    Pending,
    /// Completed successfully
    #[serde(rename = "ok")]
    Ok,
    /// Rejected or failed
    #[serde(rename = "err")]
    Error,
}

impl CommandStatus {
    /// Whether the command has been resolved
    pub fn is_final(&self) -> bool {
        !matches!(self, CommandStatus::Pending)
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Ok => write!(f, "ok"),
            Self::Error => write!(f, "err"),
        }
    }
}

/// Command acknowledgment
///
/// The terminal result record of a dispatched command. A pending ack is
/// created at enqueue time and replaced once the command resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandAck {
    /// Identifier of the command this ack belongs to
    pub id: CommandId,
    /// Resolution state
    pub status: CommandStatus,
    /// Human readable result
    pub message: String,
    /// When the ack was produced
    pub timestamp: DateTime<Utc>,
    /// Diagnostic trace for internal faults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl CommandAck {
    /// Placeholder recorded when a command is queued
    pub fn pending(id: CommandId) -> Self {
        Self::with_status(id, CommandStatus::Pending, "Command queued")
    }

    /// Successful resolution
    pub fn ok(id: CommandId, message: impl Into<String>) -> Self {
        Self::with_status(id, CommandStatus::Ok, message)
    }

    /// Failed resolution
    pub fn error(id: CommandId, message: impl Into<String>) -> Self {
        Self::with_status(id, CommandStatus::Error, message)
    }

    /// Attach a diagnostic trace
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    /// Whether the command completed successfully
    pub fn is_ok(&self) -> bool {
        self.status == CommandStatus::Ok
    }

    fn with_status(id: CommandId, status: CommandStatus, message: impl Into<String>) -> Self {
        Self {
            id,
            status,
            message: message.into(),
            timestamp: Utc::now(),
            trace: None,
        }
    }
}

/// Point-in-time system telemetry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryData {
    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,
    /// Nozzle position snapshot
    pub position: Position,
    /// Zoom actuator snapshot
    pub zoom: ZoomState,
    /// System status at snapshot time
    pub status: SystemStatus,
    /// Last fault message while in the error state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
