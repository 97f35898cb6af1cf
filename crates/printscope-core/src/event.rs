//! Event system for machine state changes
//!
//! Provides:
//! - Event types for command resolution and status changes
//! - Event dispatcher for publishing events to subscribers
//!
//! Telemetry stays pull-based; events only announce that something changed.

use crate::command::CommandId;
use crate::data::{CommandAck, SystemStatus};
use tokio::sync::broadcast;

/// Machine event types
#[derive(Debug, Clone)]
pub enum MachineEvent {
    /// A command entered the queue
    CommandQueued {
        /// Identifier of the queued command
        id: CommandId,
        /// Requested command type
        command_type: String,
    },
    /// A command resolved
    CommandResolved(CommandAck),
    /// System status changed
    StatusChanged(SystemStatus),
    /// Emergency stop latched
    EmergencyStop,
    /// Emergency stop released
    EmergencyCleared,
}

impl std::fmt::Display for MachineEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MachineEvent::CommandQueued { id, command_type } => {
                write!(f, "Queued {} ({})", command_type, id)
            }
            MachineEvent::CommandResolved(ack) => {
                write!(f, "Resolved {} [{}]: {}", ack.id, ack.status, ack.message)
            }
            MachineEvent::StatusChanged(status) => write!(f, "Status: {}", status),
            MachineEvent::EmergencyStop => write!(f, "Emergency stop activated"),
            MachineEvent::EmergencyCleared => write!(f, "Emergency stop cleared"),
        }
    }
}

/// Event dispatcher for publishing events to subscribers
#[derive(Clone)]
pub struct EventDispatcher {
    /// Broadcast sender channel for machine events.
    tx: broadcast::Sender<MachineEvent>,
}

impl EventDispatcher {
    /// Create a new event dispatcher
    ///
    /// # Arguments
    /// * `buffer_size` - Size of the broadcast buffer (default 100, at least 1)
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer_size.max(1));
        Self { tx }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<MachineEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of subscribers that received it; publishing with no
    /// subscribers is not an error.
    pub fn publish(&self, event: MachineEvent) -> usize {
        tracing::trace!(event = %event, "Publishing event");
        self.tx.send(event).unwrap_or(0)
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}
