//! DashScopeClient -- concrete [`CompletionClient`] for Alibaba DashScope.
//!
//! Chat goes through the OpenAI-compatible streaming endpoint; image and
//! video generation through the asynchronous task API (submit, then poll
//! `/tasks/{id}`).
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is only exposed
//! when building the `Authorization` header.

use std::time::Duration;

use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;

use aichat_core::llm::client::{CompletionClient, FrameStream};
use aichat_types::chat::Message;
use aichat_types::config::UpstreamConfig;
use aichat_types::generation::TaskKind;
use aichat_types::llm::{ModelProfile, UNKNOWN_ERROR_CODE, UpstreamCallError};

/// Upper bound on one stream line; a longer line ends the stream.
const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// DashScope client.
///
/// Does NOT derive Debug so the credential can never end up in logs.
pub struct DashScopeClient {
    client: reqwest::Client,
    api_key: SecretString,
    image_url: String,
    video_url: String,
    task_url_base: String,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
}

impl DashScopeClient {
    /// Header that switches DashScope generation endpoints to task mode.
    const ASYNC_HEADER: &'static str = "X-DashScope-Async";

    pub fn new(api_key: SecretString, config: &UpstreamConfig) -> Result<Self, UpstreamCallError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| UpstreamCallError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            image_url: config.image_url.clone(),
            video_url: config.video_url.clone(),
            task_url_base: config.task_url_base.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Request body for a streaming chat completion.
    fn chat_body(&self, profile: &ModelProfile, messages: &[Message]) -> Value {
        let messages: Vec<Value> = messages
            .iter()
            .map(|m| json!({ "role": m.role, "content": m.content }))
            .collect();

        let mut body = json!({
            "model": profile.model,
            "messages": messages,
            "stream": true,
            "enable_search": profile.search,
        });
        if let Some(temperature) = self.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }

    fn task_url(&self, task_id: &str) -> String {
        format!("{}/{}", self.task_url_base, task_id)
    }
}

fn transport(e: reqwest::Error) -> UpstreamCallError {
    UpstreamCallError::Transport(e.to_string())
}

/// Build a typed error from a non-2xx answer.
///
/// DashScope reports its code either at `error.code` (compatible mode) or at
/// the top-level `code` (native API); OpenAI-style bodies may only carry
/// `error.type`.
pub(crate) fn upstream_error(status: u16, body_text: &str) -> UpstreamCallError {
    let body: Option<Value> = serde_json::from_str(body_text).ok();

    let field = |pointer: &str| {
        body.as_ref()
            .and_then(|b| b.pointer(pointer))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let code = field("/error/code")
        .or_else(|| field("/code"))
        .or_else(|| field("/error/type"))
        .unwrap_or_else(|| UNKNOWN_ERROR_CODE.to_string());
    let message = field("/error/message")
        .or_else(|| field("/message"))
        .unwrap_or_else(|| body_text.to_string());

    UpstreamCallError::Upstream {
        status,
        code,
        message,
        body,
    }
}

/// Pass 2xx responses through; turn anything else into a typed error.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, UpstreamCallError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(upstream_error(status.as_u16(), &text))
}

impl CompletionClient for DashScopeClient {
    async fn send_chat_stream(
        &self,
        profile: &ModelProfile,
        messages: &[Message],
    ) -> Result<FrameStream, UpstreamCallError> {
        let body = self.chat_body(profile, messages);
        tracing::debug!(model = %profile.model, messages = messages.len(), "opening chat stream");

        let response = self
            .client
            .post(&profile.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        let response = check_status(response).await?;

        let bytes = response
            .bytes_stream()
            .map(|r| r.map_err(std::io::Error::other));
        let lines = FramedRead::new(
            StreamReader::new(bytes),
            LinesCodec::new_with_max_length(MAX_FRAME_BYTES),
        );

        let frames = lines.filter_map(|line| async move {
            match line {
                Ok(line) if line.trim().is_empty() => None,
                Ok(line) => Some(Ok(line)),
                Err(e) => Some(Err(UpstreamCallError::Transport(format!(
                    "stream read failed: {e}"
                )))),
            }
        });

        Ok(Box::pin(frames))
    }

    async fn submit_generation(
        &self,
        kind: TaskKind,
        payload: &Value,
    ) -> Result<String, UpstreamCallError> {
        let url = match kind {
            TaskKind::Image => &self.image_url,
            TaskKind::Video => &self.video_url,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(self.api_key.expose_secret())
            .header(Self::ASYNC_HEADER, "enable")
            .json(payload)
            .send()
            .await
            .map_err(transport)?;
        let document: Value = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| UpstreamCallError::Decode(format!("invalid submission response: {e}")))?;

        document
            .pointer("/output/task_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| UpstreamCallError::Decode("submission response has no output.task_id".into()))
    }

    async fn poll_task(&self, task_id: &str) -> Result<Value, UpstreamCallError> {
        let response = self
            .client
            .get(self.task_url(task_id))
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
            .map_err(transport)?;

        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| UpstreamCallError::Decode(format!("invalid task status response: {e}")))
    }
}
