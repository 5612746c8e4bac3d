use thiserror::Error;

/// Errors from repository operations (used by trait definitions in aichat-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from the durable object storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload of '{local}' to '{remote}' failed: {reason}")]
    Upload {
        local: String,
        remote: String,
        reason: String,
    },

    #[error("setting ACL '{acl}' on '{remote}' failed: {reason}")]
    Acl {
        remote: String,
        acl: String,
        reason: String,
    },
}

/// Errors from the external media post-processing tool.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to launch '{program}': {reason}")]
    Launch { program: String, reason: String },

    #[error("'{program}' exited with {status}: {stderr}")]
    ExternalTool {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("media io error: {0}")]
    Io(String),
}

/// Errors from the append-only error audit log.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit log io error: {0}")]
    Io(String),

    #[error("audit record serialization error: {0}")]
    Serialize(String),
}
