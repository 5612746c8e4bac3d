//! Media post-processing trait.

use std::path::Path;

use aichat_types::error::MediaError;

/// Runs the watermark overlay over a downloaded video.
pub trait MediaProcessor: Send + Sync {
    /// Write a watermarked copy of `input` to `output`.
    fn watermark(
        &self,
        input: &Path,
        output: &Path,
    ) -> impl std::future::Future<Output = Result<(), MediaError>> + Send;
}
