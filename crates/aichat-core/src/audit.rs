//! Error audit log port.
//!
//! Chat streams that end in an upstream error leave one record behind for
//! offline inspection. The record keeps the raw provider payload; callers
//! only ever see the translated message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use aichat_types::error::AuditError;

/// One audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub user_id: String,
    /// The prompt that was being answered.
    pub msg: String,
    /// Raw upstream error payload.
    pub error: Value,
    pub at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(user_id: impl Into<String>, msg: impl Into<String>, error: Value) -> Self {
        Self {
            user_id: user_id.into(),
            msg: msg.into(),
            error,
            at: Utc::now(),
        }
    }
}

/// Append-only sink for audit records.
pub trait ErrorAuditLog: Send + Sync {
    fn append(
        &self,
        record: &AuditRecord,
    ) -> impl std::future::Future<Output = Result<(), AuditError>> + Send;
}
