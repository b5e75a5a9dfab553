//! chatline core: transport-agnostic value types and the shared error surface.
//!
//! This crate defines the chat wire schema, the identifier newtypes and the
//! error type shared by the gateway and its tests. It carries no transport or
//! runtime dependencies so it can be reused by clients and tooling.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `ChatError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ChatError, Result};
pub use protocol::{ChatRequest, Message, MessageId, MessageRecord, MessageType, User, UserId};
