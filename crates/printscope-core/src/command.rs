//! Command model
//!
//! Commands enter the system either as typed [`CommandKind`] values or as
//! loosely typed [`CommandRequest`]s coming from an outer transport layer.
//! Requests are type-checked when the [`Command`] is created; a request that
//! fails the check still becomes a command so that it resolves, in queue
//! order, as an error acknowledgment.

use crate::data::SystemStatus;
use crate::error::CommandError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Unique command identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(Uuid);

impl CommandId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Typed command with validated parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandKind {
    /// Full 3-axis nozzle move
    Move {
        /// Target X in mm
        x: f64,
        /// Target Y in mm
        y: f64,
        /// Target Z in mm
        z: f64,
        /// Feedrate in mm/min
        feedrate: f64,
    },
    /// XY move, Z held at its stored value
    MoveXy {
        /// Target X in mm
        x: f64,
        /// Target Y in mm
        y: f64,
        /// Feedrate in mm/min
        feedrate: f64,
    },
    /// Z move, X and Y held at their stored values
    MoveZ {
        /// Target Z in mm
        z: f64,
        /// Feedrate in mm/min
        feedrate: f64,
    },
    /// Home all nozzle axes
    Home,
    /// Step the zoom actuator outwards
    ZoomIn {
        /// Signed step count
        steps: i64,
    },
    /// Step the zoom actuator inwards
    ZoomOut {
        /// Signed step count
        steps: i64,
    },
    /// Home the zoom actuator against its limit switch
    HomeZoom,
    /// Latch the emergency stop
    EmergencyStop,
    /// Release a latched emergency stop
    ClearEmergencyStop,
}

impl CommandKind {
    /// Wire name of the command type
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Move { .. } => "move",
            Self::MoveXy { .. } => "move_xy",
            Self::MoveZ { .. } => "move_z",
            Self::Home => "home",
            Self::ZoomIn { .. } => "zoom_in",
            Self::ZoomOut { .. } => "zoom_out",
            Self::HomeZoom => "home_zoom",
            Self::EmergencyStop => "emergency_stop",
            Self::ClearEmergencyStop => "clear_emergency_stop",
        }
    }

    /// Status shown while this command executes, if it has one
    pub fn busy_status(&self) -> Option<SystemStatus> {
        match self {
            Self::Home | Self::HomeZoom => Some(SystemStatus::Homing),
            Self::Move { .. }
            | Self::MoveXy { .. }
            | Self::MoveZ { .. }
            | Self::ZoomIn { .. }
            | Self::ZoomOut { .. } => Some(SystemStatus::Moving),
            Self::EmergencyStop | Self::ClearEmergencyStop => None,
        }
    }

    /// Whether the emergency stop gate applies to this command
    pub fn is_gated_by_emergency_stop(&self) -> bool {
        !matches!(self, Self::EmergencyStop | Self::ClearEmergencyStop)
    }

    /// Type-check a loosely typed request
    ///
    /// `default_feedrate` is used when a move request carries no feedrate.
    pub fn from_request(
        request: &CommandRequest,
        default_feedrate: f64,
    ) -> Result<Self, CommandError> {
        let p = ParamReader {
            command_type: &request.command_type,
            params: &request.params,
        };

        let kind = match request.command_type.as_str() {
            "move" | "move_nozzle" => Self::Move {
                x: p.number("x")?,
                y: p.number("y")?,
                z: p.number("z")?,
                feedrate: p.feedrate(default_feedrate)?,
            },
            "move_xy" | "move_nozzle_xy" => Self::MoveXy {
                x: p.number("x")?,
                y: p.number("y")?,
                feedrate: p.feedrate(default_feedrate)?,
            },
            "move_z" | "move_nozzle_z" => Self::MoveZ {
                z: p.number("z")?,
                feedrate: p.feedrate(default_feedrate)?,
            },
            "home" | "home_nozzle" => Self::Home,
            "zoom_in" => Self::ZoomIn {
                steps: p.integer("steps")?,
            },
            "zoom_out" => Self::ZoomOut {
                steps: p.integer("steps")?,
            },
            "home_zoom" => Self::HomeZoom,
            "emergency_stop" => Self::EmergencyStop,
            "clear_emergency_stop" => Self::ClearEmergencyStop,
            other => {
                return Err(CommandError::UnknownCommandType {
                    command_type: other.to_string(),
                })
            }
        };

        Ok(kind)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move { x, y, z, feedrate } => {
                write!(f, "move X:{x:.3} Y:{y:.3} Z:{z:.3} F:{feedrate:.0}")
            }
            Self::MoveXy { x, y, feedrate } => write!(f, "move_xy X:{x:.3} Y:{y:.3} F:{feedrate:.0}"),
            Self::MoveZ { z, feedrate } => write!(f, "move_z Z:{z:.3} F:{feedrate:.0}"),
            Self::ZoomIn { steps } => write!(f, "zoom_in {steps}"),
            Self::ZoomOut { steps } => write!(f, "zoom_out {steps}"),
            other => write!(f, "{}", other.type_name()),
        }
    }
}

struct ParamReader<'a> {
    command_type: &'a str,
    params: &'a Map<String, Value>,
}

impl ParamReader<'_> {
    fn invalid(&self, reason: String) -> CommandError {
        CommandError::InvalidParameters {
            command_type: self.command_type.to_string(),
            reason,
        }
    }

    fn number(&self, key: &str) -> Result<f64, CommandError> {
        match self.params.get(key) {
            Some(value) => value
                .as_f64()
                .filter(|v| v.is_finite())
                .ok_or_else(|| self.invalid(format!("'{key}' must be a finite number"))),
            None => Err(self.invalid(format!("missing '{key}'"))),
        }
    }

    fn integer(&self, key: &str) -> Result<i64, CommandError> {
        match self.params.get(key) {
            Some(value) => value
                .as_i64()
                .ok_or_else(|| self.invalid(format!("'{key}' must be an integer"))),
            None => Err(self.invalid(format!("missing '{key}'"))),
        }
    }

    fn feedrate(&self, default_feedrate: f64) -> Result<f64, CommandError> {
        let feedrate = if self.params.contains_key("feedrate") {
            self.number("feedrate")?
        } else {
            default_feedrate
        };
        if feedrate.is_finite() && feedrate > 0.0 {
            Ok(feedrate)
        } else {
            Err(self.invalid(format!("feedrate must be > 0, got {feedrate}")))
        }
    }
}

/// Loosely typed command request from an outer layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Command type name
    #[serde(rename = "type")]
    pub command_type: String,
    /// Keyed parameters
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl CommandRequest {
    /// Create a request without parameters
    pub fn new(command_type: impl Into<String>) -> Self {
        Self {
            command_type: command_type.into(),
            params: Map::new(),
        }
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// A queued command
///
/// Immutable once created.
#[derive(Debug, Clone)]
pub struct Command {
    id: CommandId,
    command_type: String,
    kind: Result<CommandKind, CommandError>,
    enqueued_at: DateTime<Utc>,
}

impl Command {
    /// Create a command from a typed kind
    pub fn new(kind: CommandKind) -> Self {
        Self {
            id: CommandId::new(),
            command_type: kind.type_name().to_string(),
            kind: Ok(kind),
            enqueued_at: Utc::now(),
        }
    }

    /// Create a command from a request, type-checking its parameters
    pub fn from_request(request: &CommandRequest, default_feedrate: f64) -> Self {
        Self {
            id: CommandId::new(),
            command_type: request.command_type.clone(),
            kind: CommandKind::from_request(request, default_feedrate),
            enqueued_at: Utc::now(),
        }
    }

    /// Command identifier
    pub fn id(&self) -> CommandId {
        self.id
    }

    /// Command type as requested
    pub fn command_type(&self) -> &str {
        &self.command_type
    }

    /// The typed command, or why the request could not be typed
    pub fn kind(&self) -> Result<&CommandKind, &CommandError> {
        self.kind.as_ref()
    }

    /// When the command was queued
    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }
}
