//! SSE streaming chat endpoint.
//!
//! POST /api/v1/ai/chat/stream
//!
//! The conversation is resolved (or created) before the response starts, so
//! an unknown `chat_id` is an ordinary 404. The stream itself runs on its own
//! task; dropping the response closes the relay channel, which the
//! orchestrator treats as a client disconnect.
//!
//! SSE `data:` payloads, in order:
//! - answer text, display-escaped
//! - `{"type":"reasoning_content","data":"..."}` for reasoning text
//! - `[LOG_ID]:<session id>` then `[DONE]` on completion
//! - a translated error message then `[EXCEPTION]` on failure

use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use aichat_types::chat::ChatRequest;

use crate::http::error::AppError;
use crate::http::extractors::owner::Owner;
use crate::state::AppState;

/// Relay events buffered between the orchestrator and the HTTP response.
const RELAY_BUFFER: usize = 64;

/// Request body for the streaming chat endpoint.
#[derive(Debug, Deserialize)]
pub struct StreamChatRequest {
    /// Model profile selector.
    #[serde(default)]
    pub model: u8,
    /// Existing conversation to continue; absent or empty starts a new one.
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub msg: String,
    /// Regenerate the last answer instead of appending `msg`.
    #[serde(default)]
    pub restart: bool,
    #[serde(default)]
    pub is_deep_reflection: bool,
}

impl StreamChatRequest {
    fn into_chat_request(self, owner_id: String) -> Result<ChatRequest, AppError> {
        let session_id = match self.chat_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(id) => Some(
                id.parse::<Uuid>()
                    .map_err(|_| AppError::Validation(format!("Invalid chat_id: {id}")))?,
            ),
        };

        if !self.restart && self.msg.trim().is_empty() {
            return Err(AppError::Validation("msg must not be empty".to_string()));
        }

        Ok(ChatRequest {
            owner_id,
            model: self.model,
            session_id,
            message: self.msg,
            restart: self.restart,
            deep_reflection: self.is_deep_reflection,
        })
    }
}

/// POST /api/v1/ai/chat/stream -- SSE streaming chat.
pub async fn stream_chat(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Json(body): Json<StreamChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let request = body.into_chat_request(owner_id)?;
    let prepared = state.chat.prepare(request).await?;

    let (tx, rx) = mpsc::channel(RELAY_BUFFER);
    let chat = state.chat.clone();
    tokio::spawn(async move {
        let outcome = chat.run(prepared, tx).await;
        tracing::info!(
            session_id = %outcome.session_id,
            state = ?outcome.state,
            "chat stream finished"
        );
    });

    let events = ReceiverStream::new(rx)
        .map(|event| Ok::<_, Infallible>(Event::default().data(event.data())));

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
