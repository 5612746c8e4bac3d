//! JSONL error audit log.
//!
//! Each [`AuditRecord`] is serialized as one JSON line and appended to the
//! file through a buffered writer, flushed after every record.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

use aichat_core::audit::{AuditRecord, ErrorAuditLog};
use aichat_types::error::AuditError;

/// Append-only audit log writing one JSON object per line.
pub struct JsonlErrorAuditLog {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlErrorAuditLog {
    /// Open (or create) the log at `path`, creating parent directories.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AuditError::Io(format!("creating {} failed: {e}", parent.display()))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| AuditError::Io(format!("opening {} failed: {e}", path.display())))?;

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ErrorAuditLog for JsonlErrorAuditLog {
    async fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut line =
            serde_json::to_vec(record).map_err(|e| AuditError::Serialize(e.to_string()))?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&line)
            .await
            .map_err(|e| AuditError::Io(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| AuditError::Io(e.to_string()))
    }
}
