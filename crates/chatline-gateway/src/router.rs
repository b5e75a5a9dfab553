//! Axum router wiring.
//!
//! `GET /messages/listen` upgrades to the chat WebSocket; `POST /messages`
//! submits a chat message over plain HTTP.

use axum::{
    routing::{get, post},
    Router,
};

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/messages/listen", get(transport::ws::ws_upgrade))
        .route("/messages", post(transport::http::send_message))
        .route("/healthz", get(ops::healthz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
