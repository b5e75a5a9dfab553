//! Plain HTTP chat submission (`POST /messages`).

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use chatline_core::ChatRequest;

use crate::app_state::AppState;
use crate::context::Identity;
use crate::error::ApiError;

pub async fn send_message(
    State(app): State<AppState>,
    Identity(user): Identity,
    Json(req): Json<ChatRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let sent = app.chat().send_message(req.message, req.kind, user).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "id": sent.record.id }))))
}
