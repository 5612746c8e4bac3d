//! Object storage backends.

pub mod local;
