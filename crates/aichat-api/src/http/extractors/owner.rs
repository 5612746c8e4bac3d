//! Caller identity extractor.
//!
//! Requests are authenticated upstream of this service; the gateway forwards
//! the caller's id in `X-User-Id`. Conversations and tasks are scoped by it.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::http::error::AppError;

/// Header carrying the caller id.
pub const OWNER_HEADER: &str = "x-user-id";

/// The requesting user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Owner {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(OWNER_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Missing X-User-Id header".to_string()))?;
        let id = value
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid X-User-Id header encoding".to_string()))?
            .trim();

        if id.is_empty() {
            return Err(AppError::Unauthorized("Empty X-User-Id header".to_string()));
        }
        Ok(Owner(id.to_string()))
    }
}
