//! Bounded command history
//!
//! One ack per command id: the pending placeholder stored at enqueue time is
//! replaced when the command resolves. When full, the oldest finalized ack is
//! evicted; pending acks are never evicted.

use printscope_core::{CommandAck, CommandId};
use std::collections::HashMap;

/// Default number of acks kept
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Command history keyed by command id
#[derive(Debug)]
pub struct CommandHistory {
    acks: HashMap<CommandId, CommandAck>,
    capacity: usize,
}

impl CommandHistory {
    /// Create a history keeping at most `capacity` acks (at least one)
    pub fn new(capacity: usize) -> Self {
        Self {
            acks: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Insert or replace the ack for its command id
    pub fn record(&mut self, ack: CommandAck) {
        if !self.acks.contains_key(&ack.id) && self.acks.len() >= self.capacity {
            self.evict_oldest_final();
        }
        self.acks.insert(ack.id, ack);
    }

    fn evict_oldest_final(&mut self) {
        let oldest = self
            .acks
            .values()
            .filter(|ack| ack.status.is_final())
            .min_by_key(|ack| ack.timestamp)
            .map(|ack| ack.id);
        if let Some(id) = oldest {
            self.acks.remove(&id);
        }
    }

    /// Ack for a command
    pub fn get(&self, id: &CommandId) -> Option<&CommandAck> {
        self.acks.get(id)
    }

    /// Up to `limit` acks, newest first
    pub fn recent(&self, limit: usize) -> Vec<CommandAck> {
        let mut acks: Vec<CommandAck> = self.acks.values().cloned().collect();
        acks.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        acks.truncate(limit);
        acks
    }

    /// Number of acks held
    pub fn len(&self) -> usize {
        self.acks.len()
    }

    /// Whether the history is empty
    pub fn is_empty(&self) -> bool {
        self.acks.is_empty()
    }

    /// Maximum number of acks held
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ack_at(offset_ms: i64, ok: bool) -> CommandAck {
        let id = CommandId::new();
        let mut ack = if ok {
            CommandAck::ok(id, "done")
        } else {
            CommandAck::pending(id)
        };
        ack.timestamp += Duration::milliseconds(offset_ms);
        ack
    }

    #[test]
    fn test_resolution_replaces_pending() {
        let mut history = CommandHistory::new(10);
        let pending = ack_at(0, false);
        let id = pending.id;
        history.record(pending);
        history.record(CommandAck::ok(id, "Moved"));

        assert_eq!(history.len(), 1);
        assert!(history.get(&id).unwrap().is_ok());
    }

    #[test]
    fn test_evicts_oldest_final_ack() {
        let mut history = CommandHistory::new(3);
        let oldest = ack_at(-300, true);
        let pending = ack_at(-400, false);
        let newer = ack_at(-100, true);
        let (oldest_id, pending_id, newer_id) = (oldest.id, pending.id, newer.id);
        history.record(oldest);
        history.record(pending);
        history.record(newer);

        let latest = ack_at(0, true);
        let latest_id = latest.id;
        history.record(latest);

        assert_eq!(history.len(), 3);
        assert!(history.get(&oldest_id).is_none());
        assert!(history.get(&pending_id).is_some());
        assert!(history.get(&newer_id).is_some());
        assert!(history.get(&latest_id).is_some());
    }

    #[test]
    fn test_recent_is_newest_first() {
        let mut history = CommandHistory::default();
        for offset in [-30, -10, -20] {
            history.record(ack_at(offset, true));
        }
        let recent = history.recent(2);
        assert_eq!(recent.len(), 2);
        assert!(recent[0].timestamp > recent[1].timestamp);
    }
}
