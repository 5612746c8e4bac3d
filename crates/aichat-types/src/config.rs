//! Application configuration types for AiChat.
//!
//! `AppConfig` represents the top-level `config.toml` in the data directory.
//! Every field has a default, so an empty or missing file is a valid
//! configuration. The upstream credential is deliberately absent: it is read
//! from the environment and never written to disk.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub media: MediaConfig,

    /// File (relative to the data directory) receiving chat error audit records.
    #[serde(default = "default_error_log")]
    pub error_log: String,

    /// Rows per work-list page.
    #[serde(default = "default_works_page_size")]
    pub works_page_size: u32,
}

fn default_error_log() -> String {
    "error.txt".to_string()
}

fn default_works_page_size() -> u32 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            upstream: UpstreamConfig::default(),
            storage: StorageConfig::default(),
            media: MediaConfig::default(),
            error_log: default_error_log(),
            works_page_size: default_works_page_size(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Remote provider endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_chat_url")]
    pub chat_url: String,
    #[serde(default = "default_image_url")]
    pub image_url: String,
    #[serde(default = "default_video_url")]
    pub video_url: String,
    /// Task status endpoint; the task id is appended as a path segment.
    #[serde(default = "default_task_url_base")]
    pub task_url_base: String,
    /// Bound on fetching a private image for base64 inlining.
    #[serde(default = "default_inline_fetch_timeout_secs")]
    pub inline_fetch_timeout_secs: u64,
    /// Sampling temperature sent with chat requests, when set.
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Output token cap sent with chat requests, when set.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

fn default_chat_url() -> String {
    "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions".to_string()
}

fn default_image_url() -> String {
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/text2image/image-synthesis".to_string()
}

fn default_video_url() -> String {
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/video-generation/video-synthesis"
        .to_string()
}

fn default_task_url_base() -> String {
    "https://dashscope.aliyuncs.com/api/v1/tasks".to_string()
}

fn default_inline_fetch_timeout_secs() -> u64 {
    30
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            chat_url: default_chat_url(),
            image_url: default_image_url(),
            video_url: default_video_url(),
            task_url_base: default_task_url_base(),
            inline_fetch_timeout_secs: default_inline_fetch_timeout_secs(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Durable storage layout and public URL bases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the local storage driver. Relative paths resolve
    /// against the data directory.
    #[serde(default = "default_storage_root")]
    pub root_dir: String,
    #[serde(default = "default_image_public_base")]
    pub image_public_base: String,
    #[serde(default = "default_video_public_base")]
    pub video_public_base: String,
    #[serde(default = "default_image_prefix")]
    pub image_prefix: String,
    #[serde(default = "default_video_prefix")]
    pub video_prefix: String,
    /// Scratch directory for downloads and post-processing.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: String,
    /// Object substituted for an image that could not be fetched.
    #[serde(default = "default_placeholder_image")]
    pub placeholder_image: String,
    #[serde(default = "default_acl")]
    pub default_acl: String,
}

fn default_storage_root() -> String {
    "storage".to_string()
}

fn default_image_public_base() -> String {
    "https://static.jsss999.com/".to_string()
}

fn default_video_public_base() -> String {
    "https://static-nine-world.oss-cn-shanghai.aliyuncs.com/".to_string()
}

fn default_image_prefix() -> String {
    "uploads/ai_images".to_string()
}

fn default_video_prefix() -> String {
    "uploads/ai_videos".to_string()
}

fn default_temp_dir() -> String {
    "uploads/temp".to_string()
}

fn default_placeholder_image() -> String {
    "images/aichat_uni/ai/ai_picture/icon_error.png".to_string()
}

fn default_acl() -> String {
    "public-read".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: default_storage_root(),
            image_public_base: default_image_public_base(),
            video_public_base: default_video_public_base(),
            image_prefix: default_image_prefix(),
            video_prefix: default_video_prefix(),
            temp_dir: default_temp_dir(),
            placeholder_image: default_placeholder_image(),
            default_acl: default_acl(),
        }
    }
}

/// Video watermarking tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_ffmpeg_bin")]
    pub ffmpeg_bin: String,
    /// Watermark image. Relative paths resolve against the data directory.
    #[serde(default = "default_watermark_image")]
    pub watermark_image: String,
    /// ffmpeg overlay position expression.
    #[serde(default = "default_overlay")]
    pub overlay: String,
}

fn default_ffmpeg_bin() -> String {
    "ffmpeg".to_string()
}

fn default_watermark_image() -> String {
    "static/watermark.png".to_string()
}

fn default_overlay() -> String {
    "W-w-10:H-h-10".to_string()
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_bin: default_ffmpeg_bin(),
            watermark_image: default_watermark_image(),
            overlay: default_overlay(),
        }
    }
}
