//! chatline gateway library entry.
//!
//! This crate wires the transport, identity extraction, chat services and the
//! realtime core (connection registry + per-connection dispatch) into one
//! gateway. It is consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod context;
pub mod error;
pub mod obs;
pub mod ops;
pub mod realtime;
pub mod router;
pub mod services;
pub mod transport;
