//! Asynchronous image/video generation.
//!
//! - `repository`: task persistence port
//! - `service`: submission, polling and finalization
//! - `private_host`: detection of URLs the upstream cannot reach

pub mod private_host;
pub mod repository;
pub mod service;
