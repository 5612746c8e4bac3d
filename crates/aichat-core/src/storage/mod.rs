//! Durable object storage and media post-processing ports.
//!
//! Implementations live in aichat-infra.

pub mod media;
pub mod object_store;
