//! Infrastructure layer for AiChat.
//!
//! Contains implementations of the port traits defined in `aichat-core`:
//! SQLite repositories, the DashScope HTTP client, the JSONL error audit
//! file, a filesystem-backed storage driver and the ffmpeg watermarker.

pub mod audit;
pub mod config;
pub mod llm;
pub mod media;
pub mod sqlite;
pub mod storage;
