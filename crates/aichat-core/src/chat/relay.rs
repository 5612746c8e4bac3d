//! Caller-facing relay events and their wire payloads.
//!
//! Each event becomes one SSE `data:` payload. Text deltas are display-escaped
//! here and only here; the orchestrator's buffers always hold the raw text.

use serde_json::json;
use uuid::Uuid;

/// One event relayed to the chat caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// Escaped answer-channel text.
    Answer(String),
    /// Escaped reasoning-channel text.
    Reasoning(String),
    /// Translated error message; always followed by `Exception`.
    Error(String),
    Exception,
    /// Id of the conversation the stream was persisted to.
    LogId(Uuid),
    Done,
}

impl RelayEvent {
    /// SSE `data:` payload for this event.
    pub fn data(&self) -> String {
        match self {
            RelayEvent::Answer(text) => text.clone(),
            RelayEvent::Reasoning(text) => {
                json!({ "type": "reasoning_content", "data": text }).to_string()
            }
            RelayEvent::Error(message) => message.clone(),
            RelayEvent::Exception => "[EXCEPTION]".to_string(),
            RelayEvent::LogId(id) => format!("[LOG_ID]:{id}"),
            RelayEvent::Done => "[DONE]".to_string(),
        }
    }
}

/// Escape text for HTML display: line breaks become `<br/>`, spaces `&nbsp;`.
///
/// Carriage returns cannot travel inside an SSE payload, so `\r\n` counts as
/// one line break and a lone `\r` is dropped.
pub fn escape_for_display(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "")
        .replace('\n', "<br/>")
        .replace(' ', "&nbsp;")
}
