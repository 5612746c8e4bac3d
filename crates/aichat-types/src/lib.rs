//! Shared domain types for AiChat.
//!
//! Conversations and their messages, model profiles, asynchronous generation
//! tasks, configuration, and the error types shared by every layer.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod generation;
pub mod llm;
