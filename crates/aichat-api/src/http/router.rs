//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`. Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Chat streaming
        .route("/ai/chat/stream", post(handlers::chat::stream_chat))
        // Image tasks
        .route("/ai/images", post(handlers::generation::submit_image))
        .route(
            "/ai/images/{task_id}",
            get(handlers::generation::image_status),
        )
        // Video tasks
        .route("/ai/videos", post(handlers::generation::submit_video))
        .route(
            "/ai/videos/{task_id}",
            get(handlers::generation::video_status),
        )
        // Work list
        .route("/ai/works", get(handlers::works::list_works));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint (no caller id required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
