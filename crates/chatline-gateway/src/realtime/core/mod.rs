//! Realtime core components for the gateway runtime.
//!
//! Dispatched connections (one worker per socket), per-user connection pools,
//! and the registry that owns registration and broadcast fan-out.

mod connection;
mod pool;
mod registry;

pub use connection::{DispatchedConnection, FrameSink};
pub use pool::ConnectionPool;
pub use registry::ConnectionRegistry;
