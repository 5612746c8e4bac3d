//! Conversation and message types.
//!
//! A `Conversation` stores the transcript exactly as it is replayed to the
//! upstream model, minus the system directive. The directive is synthesized
//! from the model profile on every stream and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A single message in a conversation.
///
/// Assistant messages may carry a separate reasoning channel. Both channels
/// are stored verbatim; display escaping is only applied on the relay side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            reasoning_content: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            reasoning_content: None,
        }
    }

    /// Build the assistant message persisted when a stream closes.
    ///
    /// The reasoning channel is always recorded, even when empty, so that a
    /// transcript shows which answers came from a reasoning-capable model run.
    pub fn assistant(content: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            reasoning_content: Some(reasoning.into()),
        }
    }
}

/// A persisted chat transcript owned by one requester and bound to one model
/// selector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub owner_id: String,
    pub model: u8,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Start a new, empty conversation.
    pub fn new(owner_id: impl Into<String>, model: u8) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            owner_id: owner_id.into(),
            model,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Inbound chat request, after transport-level decoding.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Requester identity; conversations are scoped by it.
    pub owner_id: String,
    /// Model profile selector.
    pub model: u8,
    /// Existing conversation to continue; `None` starts a new one.
    pub session_id: Option<Uuid>,
    /// The new user turn. Ignored when `restart` is set.
    pub message: String,
    /// Regenerate the last answer in place instead of appending a user turn.
    pub restart: bool,
    /// Swap in the deep-reflection model variant when the profile has one.
    pub deep_reflection: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_role_display_and_parse() {
        for role in [MessageRole::System, MessageRole::User, MessageRole::Assistant] {
            let parsed: MessageRole = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("tool".parse::<MessageRole>().is_err());
    }

    #[test]
    fn test_user_message_omits_reasoning_field() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn test_assistant_message_keeps_empty_reasoning() {
        let json = serde_json::to_value(Message::assistant("answer", "")).unwrap();
        assert_eq!(json["reasoning_content"], "");
        assert_eq!(json["content"], "answer");
    }

    #[test]
    fn test_message_deserializes_without_reasoning() {
        let msg: Message =
            serde_json::from_str(r#"{"role":"assistant","content":"ok"}"#).unwrap();
        assert_eq!(msg.role, MessageRole::Assistant);
        assert!(msg.reasoning_content.is_none());
    }

    #[test]
    fn test_new_conversation_is_empty() {
        let conversation = Conversation::new("u-1", 2);
        assert!(conversation.messages.is_empty());
        assert_eq!(conversation.model, 2);
        assert_eq!(conversation.owner_id, "u-1");
    }
}
