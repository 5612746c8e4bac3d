//! GET /api/v1/ai/works -- the caller's generated works, newest first.

use std::time::Instant;

use axum::extract::{Query, State};
use serde::Deserialize;

use aichat_types::generation::{KindFilter, WorkPage};

use crate::http::error::AppError;
use crate::http::extractors::owner::Owner;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Query parameters for the work list.
#[derive(Debug, Deserialize)]
pub struct WorksQuery {
    /// 1 = images, 2 = videos, 3 = both.
    #[serde(rename = "type", default = "default_kind")]
    pub kind: i64,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default)]
    pub hide_personal_uploads: bool,
}

fn default_kind() -> i64 {
    3
}

fn default_page() -> u32 {
    1
}

pub async fn list_works(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Query(query): Query<WorksQuery>,
) -> Result<ApiResponse<WorkPage>, AppError> {
    let start = Instant::now();
    let kind = KindFilter::from_code(query.kind).map_err(AppError::Validation)?;

    let page = state
        .generation
        .list_works(&owner_id, kind, query.page, query.hide_personal_uploads)
        .await?;

    Ok(ApiResponse::success(page, start))
}
