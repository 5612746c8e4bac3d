//! Asynchronous image/video generation task types.
//!
//! A `GenerationTask` mirrors one upstream job. Its numeric kind and status
//! codes are part of the persisted format and of the work-list API, so they
//! are fixed: kind 1 = image, 2 = video; status 0 = pending, 1 = succeeded,
//! 2 = failed, 3 = video post-processing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Kind of generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Image,
    Video,
}

impl TaskKind {
    pub fn code(self) -> i64 {
        match self {
            TaskKind::Image => 1,
            TaskKind::Video => 2,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, String> {
        match code {
            1 => Ok(TaskKind::Image),
            2 => Ok(TaskKind::Video),
            other => Err(format!("invalid task kind code: {other}")),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Image => write!(f, "image"),
            TaskKind::Video => write!(f, "video"),
        }
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(TaskKind::Image),
            "video" => Ok(TaskKind::Video),
            other => Err(format!("invalid task kind: '{other}'")),
        }
    }
}

/// Local lifecycle status of a generation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Succeeded,
    Failed,
    /// Video only: the watermark step is running.
    PostProcessing,
}

impl TaskStatus {
    pub fn code(self) -> i64 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::Succeeded => 1,
            TaskStatus::Failed => 2,
            TaskStatus::PostProcessing => 3,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, String> {
        match code {
            0 => Ok(TaskStatus::Pending),
            1 => Ok(TaskStatus::Succeeded),
            2 => Ok(TaskStatus::Failed),
            3 => Ok(TaskStatus::PostProcessing),
            other => Err(format!("invalid task status code: {other}")),
        }
    }

    /// Succeeded and failed tasks are answered from the local record.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Succeeded => write!(f, "succeeded"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::PostProcessing => write!(f, "post_processing"),
        }
    }
}

/// Stored failure payload. `raw` keeps the untranslated cause for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

/// Result payload of a finished task: either the public URLs or a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskResult {
    Urls(Vec<String>),
    Failure(TaskFailure),
}

impl TaskResult {
    pub fn failure(error: impl Into<String>, raw: Option<Value>) -> Self {
        TaskResult::Failure(TaskFailure {
            error: error.into(),
            raw,
        })
    }
}

/// Durable record of one upstream generation job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationTask {
    /// Upstream-issued task id.
    pub task_id: String,
    pub owner_id: String,
    pub kind: TaskKind,
    /// The request as submitted, kept for audit and replay.
    pub params: Value,
    pub status: TaskStatus,
    pub result: Option<TaskResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GenerationTask {
    pub fn pending(
        task_id: impl Into<String>,
        owner_id: impl Into<String>,
        kind: TaskKind,
        params: Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            task_id: task_id.into(),
            owner_id: owner_id.into(),
            kind,
            params,
            status: TaskStatus::Pending,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Requested image dimensions, written `W~H` by callers and `W*H` upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const MIN_SIDE: u32 = 720;
    pub const MAX_SIDE: u32 = 1440;
    pub const MAX_PIXELS: u32 = 2_000_000;

    /// Parse and range-check a `W~H` size.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (w, h) = s
            .split_once('~')
            .ok_or_else(|| format!("size must be written as 'width~height', got '{s}'"))?;
        let width: u32 = w
            .trim()
            .parse()
            .map_err(|_| format!("invalid image width: '{w}'"))?;
        let height: u32 = h
            .trim()
            .parse()
            .map_err(|_| format!("invalid image height: '{h}'"))?;

        let side = Self::MIN_SIDE..=Self::MAX_SIDE;
        if !side.contains(&width) || !side.contains(&height) {
            return Err(format!(
                "image sides must be within {}-{}",
                Self::MIN_SIDE,
                Self::MAX_SIDE
            ));
        }
        if width * height > Self::MAX_PIXELS {
            return Err(format!(
                "image may not exceed {} pixels",
                Self::MAX_PIXELS
            ));
        }

        Ok(Self { width, height })
    }

    /// The `W*H` form the upstream expects.
    pub fn upstream_value(&self) -> String {
        format!("{}*{}", self.width, self.height)
    }
}

/// Text-to-image submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRequest {
    /// Model tier: 1 = turbo, 2 = plus.
    pub model: u8,
    pub prompt: String,
    /// `W~H`.
    pub size: String,
    #[serde(default = "default_image_count")]
    pub n: u32,
    #[serde(default)]
    pub watermark: bool,
}

fn default_image_count() -> u32 {
    1
}

/// Video submission. `to` = 1 animates `img_url`, `to` = 2 renders `prompt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRequest {
    pub to: u8,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub img_url: Option<String>,
}

/// A generation submission of either kind.
#[derive(Debug, Clone)]
pub enum GenerationRequest {
    Image(ImageRequest),
    Video(VideoRequest),
}

impl GenerationRequest {
    pub fn kind(&self) -> TaskKind {
        match self {
            GenerationRequest::Image(_) => TaskKind::Image,
            GenerationRequest::Video(_) => TaskKind::Video,
        }
    }
}

/// What a status query reports back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskView {
    Pending { task_id: String },
    Succeeded { results: Vec<String> },
    Failed { message: String },
}

/// Work-list kind filter. On the wire: 1 = image, 2 = video, 3 = all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindFilter {
    All,
    Only(TaskKind),
}

impl KindFilter {
    pub fn from_code(code: i64) -> Result<Self, String> {
        match code {
            3 => Ok(KindFilter::All),
            other => TaskKind::from_code(other).map(KindFilter::Only),
        }
    }
}

/// Paged work-list query.
#[derive(Debug, Clone)]
pub struct WorkQuery {
    pub kind: KindFilter,
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
    /// Exclude tasks whose stored params are `{}` (personal uploads).
    pub hide_personal_uploads: bool,
}

/// One row of the work list.
#[derive(Debug, Clone, Serialize)]
pub struct WorkItem {
    pub task_id: String,
    pub params: Value,
    #[serde(rename = "type")]
    pub kind: i64,
    pub status: i64,
    pub work: Value,
}

impl From<&GenerationTask> for WorkItem {
    fn from(task: &GenerationTask) -> Self {
        Self {
            task_id: task.task_id.clone(),
            params: task.params.clone(),
            kind: task.kind.code(),
            status: task.status.code(),
            work: task
                .result
                .as_ref()
                .and_then(|r| serde_json::to_value(r).ok())
                .unwrap_or(Value::Null),
        }
    }
}

/// A page of the work list.
#[derive(Debug, Clone, Serialize)]
pub struct WorkPage {
    pub page: u32,
    pub page_count: u64,
    pub total: u64,
    pub list: Vec<WorkItem>,
}
