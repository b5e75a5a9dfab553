use std::sync::atomic::{AtomicU64, Ordering};

use chatline_core::{MessageId, MessageRecord, MessageType, UserId};

/// Assigns system-wide message ids. Safe to share between sessions.
pub struct MessageAssembler {
    next_id: AtomicU64,
}

impl Default for MessageAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageAssembler {
    /// Ids start at 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next_id: AtomicU64::new(first),
        }
    }

    pub fn create(&self, body: impl Into<String>, kind: MessageType, sender: UserId) -> MessageRecord {
        let id = MessageId(self.next_id.fetch_add(1, Ordering::Relaxed));
        MessageRecord {
            id,
            kind,
            body: body.into(),
            sender,
        }
    }
}
