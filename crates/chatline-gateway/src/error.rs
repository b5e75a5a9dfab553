//! HTTP error mapping for non-WS handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use chatline_core::error::ChatError;

/// `ChatError` as an HTTP response: status plus `{"error", "message"}` body.
#[derive(Debug)]
pub struct ApiError(pub ChatError);

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            ChatError::BadRequest(_) | ChatError::UnsupportedVersion => StatusCode::BAD_REQUEST,
            ChatError::AuthFailed => StatusCode::UNAUTHORIZED,
            ChatError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ChatError::Transport(_) | ChatError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.0.client_code().as_str(),
            "message": self.0.to_string(),
        }));
        (self.status(), body).into_response()
    }
}
