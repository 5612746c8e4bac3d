//! LocalStorageDriver -- object storage rooted in a local directory.
//!
//! Object keys map to paths under `root`. ACLs are recorded in a sidecar
//! `<key>.acl` file next to the object so a fronting web server can honor
//! them.

use std::path::{Component, Path, PathBuf};

use aichat_core::storage::object_store::StorageDriver;
use aichat_types::error::StorageError;

#[derive(Debug, Clone)]
pub struct LocalStorageDriver {
    root: PathBuf,
}

impl LocalStorageDriver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object key below the root. Keys may not escape it.
    fn object_path(&self, remote: &str) -> Result<PathBuf, String> {
        let key = Path::new(remote.trim_start_matches('/'));
        if key.as_os_str().is_empty() {
            return Err("empty object key".to_string());
        }
        if key
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(format!("object key '{remote}' escapes the storage root"));
        }
        Ok(self.root.join(key))
    }
}

impl StorageDriver for LocalStorageDriver {
    async fn upload(&self, local: &Path, remote: &str) -> Result<(), StorageError> {
        let upload_err = |reason: String| StorageError::Upload {
            local: local.display().to_string(),
            remote: remote.to_string(),
            reason,
        };

        let dest = self.object_path(remote).map_err(upload_err)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| upload_err(e.to_string()))?;
        }
        let size = tokio::fs::copy(local, &dest)
            .await
            .map_err(|e| upload_err(e.to_string()))?;

        tracing::debug!(remote, size, "stored object");
        Ok(())
    }

    async fn set_acl(&self, remote: &str, acl: &str) -> Result<(), StorageError> {
        let acl_err = |reason: String| StorageError::Acl {
            remote: remote.to_string(),
            acl: acl.to_string(),
            reason,
        };

        let object = self.object_path(remote).map_err(acl_err)?;
        if !tokio::fs::try_exists(&object).await.unwrap_or(false) {
            return Err(acl_err("object does not exist".to_string()));
        }

        let mut sidecar = object.into_os_string();
        sidecar.push(".acl");
        tokio::fs::write(&sidecar, acl)
            .await
            .map_err(|e| acl_err(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn source_file(dir: &Path) -> PathBuf {
        let path = dir.join("source.png");
        tokio::fs::write(&path, b"png-bytes").await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_upload_creates_nested_object() {
        let dir = tempfile::tempdir().unwrap();
        let driver = LocalStorageDriver::new(dir.path().join("bucket"));
        let local = source_file(dir.path()).await;

        driver.upload(&local, "images/2025/a.png").await.unwrap();

        let stored = tokio::fs::read(driver.root().join("images/2025/a.png"))
            .await
            .unwrap();
        assert_eq!(stored, b"png-bytes");
    }

    #[tokio::test]
    async fn test_upload_rejects_escaping_key() {
        let dir = tempfile::tempdir().unwrap();
        let driver = LocalStorageDriver::new(dir.path().join("bucket"));
        let local = source_file(dir.path()).await;

        let err = driver.upload(&local, "../outside.png").await.unwrap_err();
        assert!(matches!(err, StorageError::Upload { .. }));
        assert!(!dir.path().join("outside.png").exists());
    }

    #[tokio::test]
    async fn test_upload_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let driver = LocalStorageDriver::new(dir.path());

        let err = driver
            .upload(&dir.path().join("nope.png"), "images/a.png")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Upload { .. }));
    }

    #[tokio::test]
    async fn test_set_acl_writes_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let driver = LocalStorageDriver::new(dir.path().join("bucket"));
        let local = source_file(dir.path()).await;
        driver.upload(&local, "/videos/t.mp4").await.unwrap();

        driver.set_acl("/videos/t.mp4", "public-read").await.unwrap();

        let acl = tokio::fs::read_to_string(driver.root().join("videos/t.mp4.acl"))
            .await
            .unwrap();
        assert_eq!(acl, "public-read");
    }

    #[tokio::test]
    async fn test_set_acl_on_missing_object_fails() {
        let dir = tempfile::tempdir().unwrap();
        let driver = LocalStorageDriver::new(dir.path());

        let err = driver.set_acl("videos/none.mp4", "public-read").await.unwrap_err();
        assert!(matches!(err, StorageError::Acl { .. }));
    }
}
