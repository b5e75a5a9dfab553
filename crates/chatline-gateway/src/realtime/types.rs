use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message as WsMessage;

use chatline_core::error::{ChatError, Result};
use chatline_core::Message;

use crate::config::DispatchSection;

/// Pool-local handle for one registered connection. Never reused within a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(pub u64);

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Frame queued for a connection's worker (serialize once, send N times).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparedMsg {
    Text(Arc<str>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

impl PreparedMsg {
    pub fn prepare(msg: &Message) -> Result<Self> {
        let s = serde_json::to_string(msg)
            .map_err(|e| ChatError::Internal(format!("json encode failed: {e}")))?;
        Ok(PreparedMsg::Text(Arc::from(s)))
    }

    /// Text payload, if this is a data frame.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PreparedMsg::Text(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// Convert to axum::ws::Message for transport.
    pub fn to_ws_message(&self) -> WsMessage {
        match self {
            PreparedMsg::Text(s) => WsMessage::Text(s.to_string()),
            PreparedMsg::Ping(v) => WsMessage::Ping(v.clone()),
            PreparedMsg::Pong(v) => WsMessage::Pong(v.clone()),
            PreparedMsg::Close => WsMessage::Close(None),
        }
    }
}

/// Queue and deadline settings shared by connections and the registry.
#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    pub queue_capacity: usize,
    pub write_timeout: Duration,
    pub enqueue_timeout: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self::from(&DispatchSection::default())
    }
}

impl From<&DispatchSection> for DispatchOptions {
    fn from(s: &DispatchSection) -> Self {
        Self {
            queue_capacity: s.queue_capacity.max(1),
            write_timeout: s.write_timeout(),
            enqueue_timeout: s.enqueue_timeout(),
        }
    }
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub recipients: usize,
    pub delivered: usize,
    pub dropped: usize,
}
