//! External media tools.

pub mod ffmpeg;
