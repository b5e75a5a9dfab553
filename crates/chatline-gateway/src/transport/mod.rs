//! Transport layer (WebSocket + HTTP).
//!
//! Exposes the WS upgrade handler, the socket sink used by dispatch workers,
//! the inbound codec, and the HTTP send endpoint.

pub mod codec;
pub mod http;
pub mod sink;
pub mod ws;
