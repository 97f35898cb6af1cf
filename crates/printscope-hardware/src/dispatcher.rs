//! Command dispatcher
//!
//! A FIFO queue in front of one [`Hardware`] instance. Any number of callers
//! may enqueue; commands execute one at a time in enqueue order. The queue
//! lock only guards the queue and the current-command marker and is never
//! held across hardware work.
//!
//! Every command resolves exactly once into a [`CommandAck`]. Faults raised
//! while executing, panics included, become error acks and never reach the
//! caller.

use crate::hardware::Hardware;
use crate::history::CommandHistory;
use parking_lot::Mutex;
use printscope_core::{
    Command, CommandAck, CommandId, CommandKind, CommandRequest, ErrorKind, MachineEvent,
    SystemStatus,
};
use serde::Serialize;
use std::backtrace::Backtrace;
use std::collections::VecDeque;
use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Notify;

/// Default number of acks returned by [`CommandDispatcher::command_history`]
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Queue snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueStatus {
    /// Commands waiting behind the current one
    pub queue_length: usize,
    /// Command being executed
    pub current_command: Option<CommandId>,
    /// System status
    pub system_status: SystemStatus,
    /// Whether the emergency stop is latched
    pub emergency_stop: bool,
    /// Acks held in history
    pub history_size: usize,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Command>,
    current: Option<CommandId>,
}

/// FIFO command dispatcher
pub struct CommandDispatcher {
    hardware: Arc<Hardware>,
    queue: Arc<Mutex<QueueState>>,
    history: Arc<Mutex<CommandHistory>>,
    notify: Arc<Notify>,
    default_feedrate: f64,
}

/// Everything needed to resolve one command, detached from the caller
///
/// Resolution runs in its own task, so dropping [`CommandDispatcher::process_next`]
/// never leaves the current-command marker set or the ack pending.
struct Resolution {
    hardware: Arc<Hardware>,
    queue: Arc<Mutex<QueueState>>,
    history: Arc<Mutex<CommandHistory>>,
    notify: Arc<Notify>,
}

impl CommandDispatcher {
    /// Create a dispatcher
    ///
    /// `default_feedrate` fills in move requests that carry none.
    pub fn new(hardware: Arc<Hardware>, history_capacity: usize, default_feedrate: f64) -> Self {
        Self {
            hardware,
            queue: Arc::new(Mutex::new(QueueState::default())),
            history: Arc::new(Mutex::new(CommandHistory::new(history_capacity))),
            notify: Arc::new(Notify::new()),
            default_feedrate,
        }
    }

    /// Hardware the dispatcher drives
    pub fn hardware(&self) -> &Arc<Hardware> {
        &self.hardware
    }

    /// Queue a typed command
    pub fn enqueue(&self, kind: CommandKind) -> CommandId {
        self.enqueue_command(Command::new(kind))
    }

    /// Queue a loosely typed request
    ///
    /// A request that fails type checking is still queued and resolves, in
    /// order, as an error ack.
    pub fn submit(&self, request: CommandRequest) -> CommandId {
        self.enqueue_command(Command::from_request(&request, self.default_feedrate))
    }

    /// Queue a prepared command
    ///
    /// A queued emergency stop latches immediately so it interrupts the
    /// command in flight; its ack still resolves in queue order.
    pub fn enqueue_command(&self, command: Command) -> CommandId {
        let id = command.id();
        let command_type = command.command_type().to_string();

        if let Ok(CommandKind::EmergencyStop) = command.kind() {
            self.hardware.machine().raise_emergency();
        }

        self.history.lock().record(CommandAck::pending(id));
        self.queue.lock().pending.push_back(command);
        self.notify.notify_one();

        tracing::debug!(command_id = %id, command_type = %command_type, "Command queued");
        self.hardware
            .machine()
            .events()
            .publish(MachineEvent::CommandQueued { id, command_type });
        id
    }

    /// Execute the next queued command
    ///
    /// Returns `None` when the queue is empty or another command is still in
    /// flight. Cancel-safe: once a command is popped it resolves even if the
    /// returned future is dropped.
    pub async fn process_next(&self) -> Option<CommandAck> {
        let command = {
            let mut queue = self.queue.lock();
            if queue.current.is_some() {
                return None;
            }
            let command = queue.pending.pop_front()?;
            queue.current = Some(command.id());
            command
        };

        let id = command.id();
        let resolution = Resolution {
            hardware: self.hardware.clone(),
            queue: self.queue.clone(),
            history: self.history.clone(),
            notify: self.notify.clone(),
        };

        match tokio::spawn(resolution.resolve(command)).await {
            Ok(ack) => Some(ack),
            Err(join_error) => {
                let ack = CommandAck::error(id, format!("Internal fault: {}", join_error));
                tracing::error!(command_id = %id, "Resolution task failed: {}", join_error);
                self.history.lock().record(ack.clone());
                self.queue.lock().current = None;
                Some(ack)
            }
        }
    }

    /// Drain the queue until `shutdown` resolves
    ///
    /// Sleeps while the queue is empty and wakes on every enqueue. The
    /// command in flight when `shutdown` resolves is allowed to finish.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!("Command dispatcher started");

        loop {
            while self.process_next().await.is_some() {}

            tokio::select! {
                biased;

                _ = &mut shutdown => break,
                _ = self.notify.notified() => {}
            }
        }

        tracing::info!("Command dispatcher stopped");
    }

    /// Latch the emergency stop immediately, bypassing the queue
    pub async fn emergency_stop(&self) {
        self.hardware.emergency_stop().await;
    }

    /// Release the emergency stop immediately, bypassing the queue
    pub fn clear_emergency_stop(&self) {
        self.hardware.clear_emergency_stop();
    }

    /// Queue snapshot
    pub fn queue_status(&self) -> QueueStatus {
        let (queue_length, current_command) = {
            let queue = self.queue.lock();
            (queue.pending.len(), queue.current)
        };
        let machine = self.hardware.machine();
        QueueStatus {
            queue_length,
            current_command,
            system_status: machine.status(),
            emergency_stop: machine.is_emergency_stopped(),
            history_size: self.history.lock().len(),
        }
    }

    /// Latest ack for a command, pending or final
    pub fn command_status(&self, id: &CommandId) -> Option<CommandAck> {
        self.history.lock().get(id).cloned()
    }

    /// Up to `limit` acks, newest first
    pub fn command_history(&self, limit: usize) -> Vec<CommandAck> {
        self.history.lock().recent(limit)
    }
}

impl Resolution {
    async fn resolve(self, command: Command) -> CommandAck {
        let ack = self.execute(&command).await;

        self.history.lock().record(ack.clone());
        let more_queued = {
            let mut queue = self.queue.lock();
            queue.current = None;
            !queue.pending.is_empty()
        };
        if more_queued {
            self.notify.notify_one();
        }

        if ack.is_ok() {
            tracing::info!(
                command_id = %ack.id,
                command_type = command.command_type(),
                "{}",
                ack.message
            );
        } else {
            tracing::warn!(
                command_id = %ack.id,
                command_type = command.command_type(),
                "{}",
                ack.message
            );
        }
        self.hardware
            .machine()
            .events()
            .publish(MachineEvent::CommandResolved(ack.clone()));
        ack
    }

    async fn execute(&self, command: &Command) -> CommandAck {
        let id = command.id();
        let kind = match command.kind() {
            Ok(kind) => kind.clone(),
            Err(e) => return CommandAck::error(id, e.to_string()),
        };

        let hardware = self.hardware.clone();
        let task = tokio::spawn(async move { hardware.execute(&kind).await });

        match task.await {
            Ok(Ok(message)) => CommandAck::ok(id, message),
            Ok(Err(e)) if e.kind() == ErrorKind::InternalFault => {
                let trace = fault_trace(command.command_type(), &e);
                CommandAck::error(id, e.to_string()).with_trace(trace)
            }
            Ok(Err(e)) => CommandAck::error(id, e.to_string()),
            Err(join_error) => {
                let reason = if join_error.is_panic() {
                    panic_message(join_error.into_panic())
                } else {
                    "execution cancelled".to_string()
                };
                let message = format!("Internal fault: {}", reason);
                tracing::error!(
                    command_id = %id,
                    command_type = command.command_type(),
                    "{}",
                    message
                );
                self.hardware.record_fault(message.clone());
                let trace = format!(
                    "panicked while executing '{}': {}\n{}",
                    command.command_type(),
                    reason,
                    Backtrace::force_capture()
                );
                CommandAck::error(id, message).with_trace(trace)
            }
        }
    }
}

/// Error source chain followed by a backtrace of the dispatcher
fn fault_trace(command_type: &str, error: &(dyn StdError + 'static)) -> String {
    let mut trace = format!("'{}' failed: {}", command_type, error);
    let mut source = error.source();
    while let Some(cause) = source {
        trace.push_str(&format!("\ncaused by: {}", cause));
        source = cause.source();
    }
    trace.push_str(&format!("\n{}", Backtrace::force_capture()));
    trace
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
