//! Remote provider abstractions.
//!
//! - `CompletionClient` / `ResourceFetcher`: ports implemented by the HTTP
//!   adapter in aichat-infra
//! - `profile`: the fixed model profile table
//! - `translate`: upstream error code to user-facing message mapping

pub mod client;
pub mod profile;
pub mod translate;
