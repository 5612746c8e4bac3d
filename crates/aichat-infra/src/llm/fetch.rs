//! HttpFetcher -- plain downloads of generated artifacts and caller images.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use aichat_core::llm::client::{FetchedResource, ResourceFetcher};
use aichat_types::llm::UpstreamCallError;

use super::dashscope::check_status;

/// MIME type assumed when neither the response nor the URL tells us.
const FALLBACK_IMAGE_MIME: &str = "image/jpeg";

#[derive(Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Guess an image MIME type from the path component of `url`.
///
/// Only image types are accepted; anything else falls back to JPEG.
pub(crate) fn guess_mime(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    mime_guess::from_path(path)
        .iter()
        .find(|m| m.type_().as_str() == "image")
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| FALLBACK_IMAGE_MIME.to_string())
}

fn content_type(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
}

fn transport(e: reqwest::Error) -> UpstreamCallError {
    if e.is_timeout() {
        UpstreamCallError::Transport(format!("timed out: {e}"))
    } else {
        UpstreamCallError::Transport(e.to_string())
    }
}

impl ResourceFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        timeout: Option<Duration>,
    ) -> Result<FetchedResource, UpstreamCallError> {
        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = check_status(request.send().await.map_err(transport)?).await?;
        let mime = content_type(&response).unwrap_or_else(|| guess_mime(url));
        let bytes = response.bytes().await.map_err(transport)?;

        tracing::debug!(url, mime = %mime, size = bytes.len(), "fetched resource");
        Ok(FetchedResource {
            bytes: bytes.to_vec(),
            mime,
        })
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<(), UpstreamCallError> {
        let io_err = |e: std::io::Error| {
            UpstreamCallError::Transport(format!("writing '{}' failed: {e}", dest.display()))
        };

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let response = check_status(self.client.get(url).send().await.map_err(transport)?).await?;
        let mut file = tokio::fs::File::create(dest).await.map_err(io_err)?;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            file.write_all(&chunk.map_err(transport)?)
                .await
                .map_err(io_err)?;
        }
        file.flush().await.map_err(io_err)?;

        tracing::debug!(url, dest = %dest.display(), "downloaded resource");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_mime_from_extension() {
        assert_eq!(guess_mime("http://10.0.0.2/a/cat.png"), "image/png");
        assert_eq!(guess_mime("http://10.0.0.2/a/cat.webp?x=1"), "image/webp");
    }

    #[test]
    fn test_guess_mime_ignores_query() {
        assert_eq!(guess_mime("http://host/img.gif?name=x.txt"), "image/gif");
    }

    #[test]
    fn test_guess_mime_falls_back_to_jpeg() {
        assert_eq!(guess_mime("http://host/download"), "image/jpeg");
        assert_eq!(guess_mime("http://host/notes.txt"), "image/jpeg");
    }

    #[tokio::test]
    async fn test_fetch_unreachable_is_transport_error() {
        let fetcher = HttpFetcher::new();
        let result = fetcher
            .fetch("http://127.0.0.1:9/x.png", Some(Duration::from_secs(2)))
            .await;
        assert!(matches!(result, Err(UpstreamCallError::Transport(_))));
    }

    #[tokio::test]
    async fn test_download_unreachable_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested/out.mp4");

        let result = HttpFetcher::new()
            .download("http://127.0.0.1:9/v.mp4", &dest)
            .await;
        assert!(matches!(result, Err(UpstreamCallError::Transport(_))));
        assert!(!dest.exists());
        assert!(dest.parent().unwrap().exists());
    }
}
