//! Upstream client traits.
//!
//! `CompletionClient` covers the provider's own endpoints; `ResourceFetcher`
//! covers plain downloads of generated artifacts and caller-supplied images.
//! Neither retries: a failed call is reported upward unchanged.

use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use futures_util::Stream;
use serde_json::Value;

use aichat_types::chat::Message;
use aichat_types::generation::TaskKind;
use aichat_types::llm::{ModelProfile, UpstreamCallError};

/// Raw frames of a streaming chat response, one line-delimited unit each,
/// in upstream emission order.
pub type FrameStream =
    Pin<Box<dyn Stream<Item = Result<String, UpstreamCallError>> + Send + 'static>>;

/// Client for the remote completion provider.
///
/// Every call carries the configured bearer credential. Non-2xx answers are
/// surfaced as `UpstreamCallError::Upstream` with the provider's code;
/// network failures as `UpstreamCallError::Transport`.
pub trait CompletionClient: Send + Sync {
    /// Open a streaming chat completion for `messages` under `profile`.
    fn send_chat_stream(
        &self,
        profile: &ModelProfile,
        messages: &[Message],
    ) -> impl std::future::Future<Output = Result<FrameStream, UpstreamCallError>> + Send;

    /// Submit an asynchronous generation job and return the upstream task id.
    fn submit_generation(
        &self,
        kind: TaskKind,
        payload: &Value,
    ) -> impl std::future::Future<Output = Result<String, UpstreamCallError>> + Send;

    /// Fetch the raw status document of an upstream task.
    fn poll_task(
        &self,
        task_id: &str,
    ) -> impl std::future::Future<Output = Result<Value, UpstreamCallError>> + Send;
}

/// A fetched resource held in memory.
#[derive(Debug, Clone)]
pub struct FetchedResource {
    pub bytes: Vec<u8>,
    /// From the `Content-Type` header, else guessed from the URL path.
    pub mime: String,
}

/// Plain HTTP downloads.
pub trait ResourceFetcher: Send + Sync {
    /// Fetch `url` into memory. When `timeout` is set, exceeding it is a
    /// transport error.
    fn fetch(
        &self,
        url: &str,
        timeout: Option<Duration>,
    ) -> impl std::future::Future<Output = Result<FetchedResource, UpstreamCallError>> + Send;

    /// Stream `url` into the local file `dest`, creating parent directories.
    fn download(
        &self,
        url: &str,
        dest: &Path,
    ) -> impl std::future::Future<Output = Result<(), UpstreamCallError>> + Send;
}
