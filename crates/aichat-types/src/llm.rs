//! Upstream model types: profiles and the remote call error taxonomy.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// Error code used when the transport failed before the upstream could answer.
pub const CONNECTION_ERROR_CODE: &str = "APIConnectionError";

/// Error code used when the upstream answered without a recognizable code.
pub const UNKNOWN_ERROR_CODE: &str = "Unknown error";

/// Immutable description of one chat model selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub selector: u8,
    /// Chat completion endpoint.
    pub endpoint: String,
    /// Upstream model name.
    pub model: String,
    /// System directive prepended to every outbound message list.
    pub directive: String,
    /// Ask the upstream to augment answers with web search.
    pub search: bool,
}

/// Failure of a call to the remote provider.
///
/// `Transport` and `Upstream` are kept apart: the former means no structured
/// answer was received at all, the latter carries the provider's own code.
#[derive(Debug, Clone, Error)]
pub enum UpstreamCallError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream error '{code}' (HTTP {status}): {message}")]
    Upstream {
        status: u16,
        code: String,
        message: String,
        body: Option<Value>,
    },

    #[error("unexpected upstream response: {0}")]
    Decode(String),
}

impl UpstreamCallError {
    /// The code fed to the error translator.
    pub fn code(&self) -> &str {
        match self {
            UpstreamCallError::Transport(_) => CONNECTION_ERROR_CODE,
            UpstreamCallError::Upstream { code, .. } => code,
            UpstreamCallError::Decode(_) => UNKNOWN_ERROR_CODE,
        }
    }

    /// Raw error payload kept for audit records.
    pub fn raw(&self) -> Value {
        match self {
            UpstreamCallError::Upstream {
                body: Some(body), ..
            } => body.clone(),
            UpstreamCallError::Upstream {
                status,
                code,
                message,
                body: None,
            } => json!({ "status": status, "code": code, "message": message }),
            other => json!({ "code": other.code(), "message": other.to_string() }),
        }
    }
}
