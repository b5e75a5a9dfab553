//! Chat message values (JSON over text frames).
//!
//! `type` travels as its integer discriminant. Clients may send any integer;
//! values outside the known set decode as [`MessageType::Unknown`] and are
//! ignored by the gateway.

use serde::{Deserialize, Serialize};

use super::ids::{MessageId, UserId};

/// Kind of chat message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum MessageType {
    #[default]
    Unknown,
    Text,
    Retract,
}

impl From<i64> for MessageType {
    fn from(v: i64) -> Self {
        match v {
            1 => MessageType::Text,
            2 => MessageType::Retract,
            _ => MessageType::Unknown,
        }
    }
}

impl From<MessageType> for i64 {
    fn from(t: MessageType) -> Self {
        match t {
            MessageType::Unknown => 0,
            MessageType::Text => 1,
            MessageType::Retract => 2,
        }
    }
}

/// Author block attached to every delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    /// True only on the copies delivered to the author's own connections.
    #[serde(default)]
    pub is_me: bool,
}

/// Outbound message as written to a recipient's socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub message: String,
    pub user: User,
}

/// Inbound chat frame sent by a client.
///
/// Extra fields are ignored so a client can echo a full [`Message`] back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatRequest {
    #[serde(rename = "type", default)]
    pub kind: MessageType,
    #[serde(default)]
    pub message: String,
}

/// A chat message after id assignment, before fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: MessageId,
    pub kind: MessageType,
    pub body: String,
    pub sender: UserId,
}

impl MessageRecord {
    /// Per-recipient copy: same id and body, `is_me` computed for `recipient`.
    pub fn project_for(&self, recipient: UserId) -> Message {
        self.projection(recipient == self.sender)
    }

    /// The copy seen by the author's connections (`true`) or by everyone else.
    pub fn projection(&self, is_me: bool) -> Message {
        Message {
            id: self.id,
            kind: self.kind,
            message: self.body.clone(),
            user: User {
                id: self.sender,
                name: String::new(),
                is_me,
            },
        }
    }
}
