//! Business logic and port trait definitions for AiChat.
//!
//! This crate defines the "ports" (repository, upstream, storage, media and
//! audit traits) that the infrastructure layer implements, plus the two
//! stateful engines built on them: the chat streaming orchestrator and the
//! generation task manager. It depends only on `aichat-types` -- never on
//! `aichat-infra` or any database/HTTP crate.

pub mod audit;
pub mod chat;
pub mod generation;
pub mod llm;
pub mod storage;
