//! Image and video generation task endpoints.
//!
//! - POST /api/v1/ai/images            - Submit a text-to-image task
//! - GET  /api/v1/ai/images/{task_id}  - Poll (and finalize) an image task
//! - POST /api/v1/ai/videos            - Submit a video task
//! - GET  /api/v1/ai/videos/{task_id}  - Poll (and finalize) a video task

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use aichat_types::generation::{
    GenerationRequest, ImageRequest, TaskKind, TaskView, VideoRequest,
};

use crate::http::error::AppError;
use crate::http::extractors::owner::Owner;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Response body of a successful submission.
#[derive(Debug, Serialize)]
pub struct Submitted {
    pub task_id: String,
}

async fn submit(
    state: &AppState,
    owner_id: &str,
    request: GenerationRequest,
) -> Result<ApiResponse<Submitted>, AppError> {
    let start = Instant::now();
    let task_id = state.generation.submit(owner_id, request).await?;
    tracing::info!(task_id = %task_id, owner = %owner_id, "generation task submitted");
    Ok(ApiResponse::success(Submitted { task_id }, start))
}

async fn status(
    state: &AppState,
    owner_id: &str,
    kind: TaskKind,
    task_id: &str,
) -> Result<ApiResponse<TaskView>, AppError> {
    let start = Instant::now();
    let view = state.generation.get_status(owner_id, kind, task_id).await?;
    Ok(ApiResponse::success(view, start))
}

/// POST /api/v1/ai/images
pub async fn submit_image(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Json(body): Json<ImageRequest>,
) -> Result<ApiResponse<Submitted>, AppError> {
    submit(&state, &owner_id, GenerationRequest::Image(body)).await
}

/// GET /api/v1/ai/images/{task_id}
pub async fn image_status(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Path(task_id): Path<String>,
) -> Result<ApiResponse<TaskView>, AppError> {
    status(&state, &owner_id, TaskKind::Image, &task_id).await
}

/// POST /api/v1/ai/videos
pub async fn submit_video(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Json(body): Json<VideoRequest>,
) -> Result<ApiResponse<Submitted>, AppError> {
    submit(&state, &owner_id, GenerationRequest::Video(body)).await
}

/// GET /api/v1/ai/videos/{task_id}
pub async fn video_status(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Path(task_id): Path<String>,
) -> Result<ApiResponse<TaskView>, AppError> {
    status(&state, &owner_id, TaskKind::Video, &task_id).await
}
