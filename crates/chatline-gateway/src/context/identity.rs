//! Caller identity from the `X-User-Id` request header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use async_trait::async_trait;

use chatline_core::error::{ChatError, Result};
use chatline_core::UserId;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller, resolved before the handler (or WS upgrade) runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity(pub UserId);

pub fn user_id_from_headers(headers: &HeaderMap) -> Result<UserId> {
    let raw = headers
        .get(USER_ID_HEADER)
        .ok_or(ChatError::AuthFailed)?
        .to_str()
        .map_err(|_| ChatError::AuthFailed)?;
    raw.parse::<UserId>().map_err(|_| ChatError::AuthFailed)
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        let user = user_id_from_headers(&parts.headers)?;
        Ok(Identity(user))
    }
}
