//! Upstream HTTP adapters.
//!
//! - `dashscope`: `CompletionClient` for the DashScope chat and task APIs
//! - `fetch`: `ResourceFetcher` for plain downloads

pub mod dashscope;
pub mod fetch;
