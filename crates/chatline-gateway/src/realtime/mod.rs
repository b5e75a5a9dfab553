//! Realtime runtime (egress engine) for the chat gateway.

pub mod core;
pub mod types;

pub use self::core::{ConnectionPool, ConnectionRegistry, DispatchedConnection, FrameSink};
pub use types::{BroadcastReport, DispatchOptions, PreparedMsg, RegistrationId};
