//! Decode-once codec for inbound WebSocket frames.
//!
//! - Text and binary frames => `ChatRequest` (JSON)
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;
use chatline_core::{
    error::{ChatError, Result},
    ChatRequest,
};

#[derive(Debug)]
pub enum Inbound {
    Chat(ChatRequest),
    Ping(Vec<u8>),
    Pong,
    Close,
}

pub fn decode(msg: Message) -> Result<Inbound> {
    match msg {
        Message::Text(s) => serde_json::from_str(&s)
            .map(Inbound::Chat)
            .map_err(|e| ChatError::BadRequest(format!("invalid chat json: {e}"))),
        Message::Binary(b) => serde_json::from_slice(&b)
            .map(Inbound::Chat)
            .map_err(|e| ChatError::BadRequest(format!("invalid chat json: {e}"))),
        Message::Ping(v) => Ok(Inbound::Ping(v)),
        Message::Pong(_) => Ok(Inbound::Pong),
        Message::Close(_) => Ok(Inbound::Close),
    }
}
