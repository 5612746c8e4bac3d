//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use aichat_core::chat::orchestrator::ChatError;
use aichat_core::generation::service::GenerationError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Chat stream setup errors.
    Chat(ChatError),
    /// Generation task errors.
    Generation(GenerationError),
    /// Missing caller identity.
    Unauthorized(String),
    /// Validation error.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl From<GenerationError> for AppError {
    fn from(e: GenerationError) -> Self {
        AppError::Generation(e)
    }
}

impl AppError {
    /// Status, machine-readable code and caller-facing message.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Chat(ChatError::SessionNotFound) => (
                StatusCode::NOT_FOUND,
                "SESSION_NOT_FOUND",
                "Conversation not found".to_string(),
            ),
            AppError::Chat(e @ ChatError::NothingToRegenerate) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AppError::Chat(ChatError::Repository(e)) => {
                tracing::error!(error = %e, "chat repository failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal error".to_string(),
                )
            }
            AppError::Generation(e) => {
                let (status, code) = match e {
                    GenerationError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                    GenerationError::NotFound => (StatusCode::NOT_FOUND, "TASK_NOT_FOUND"),
                    GenerationError::Conflict => (StatusCode::CONFLICT, "TASK_POST_PROCESSING"),
                    GenerationError::Upstream { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
                    GenerationError::Transport(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_UNAVAILABLE"),
                    GenerationError::MissingResult(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_DATA_ERROR"),
                    GenerationError::ExternalTool(_)
                    | GenerationError::Repository(_)
                    | GenerationError::Storage(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "GENERATION_ERROR")
                    }
                };
                if status.is_server_error() {
                    tracing::warn!(error = %e, code, "generation request failed");
                }
                (status, code, e.user_message())
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = json!({
            "data": null,
            "meta": {
                "request_id": "",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
