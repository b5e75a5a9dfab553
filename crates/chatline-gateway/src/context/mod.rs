//! Request context shared across layers.
//!
//! Identity extraction lives here so handlers and the WS upgrade path resolve
//! the caller the same way, without coupling to transport specifics.

pub mod identity;

pub use identity::{user_id_from_headers, Identity, USER_ID_HEADER};
