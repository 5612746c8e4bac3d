//! Object storage trait.

use std::path::Path;

use aichat_types::error::StorageError;

/// Durable object storage for generated artifacts.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait StorageDriver: Send + Sync {
    /// Upload the local file `local` under the object key `remote`.
    fn upload(
        &self,
        local: &Path,
        remote: &str,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Apply an access-control setting such as `public-read` to `remote`.
    fn set_acl(
        &self,
        remote: &str,
        acl: &str,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;
}
