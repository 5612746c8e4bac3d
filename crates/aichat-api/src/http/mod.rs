//! HTTP/REST API layer for AiChat.
//!
//! Axum-based API at `/api/v1/`: the streaming chat endpoint (SSE) and the
//! generation task endpoints, which answer in the envelope format.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
