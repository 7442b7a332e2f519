use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use super::{content, handlers, middleware::metrics_middleware, runs};
use crate::state::AppState;

/// Largest accepted image upload.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let output_root = state.config().output.root.clone();

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/usage", get(handlers::get_usage))
        // Runs
        .route("/runs", post(runs::start_run))
        .route("/runs/cancel", post(runs::cancel_run))
        .route("/runs/progress", get(runs::get_progress))
        .route("/category", get(runs::get_category).put(runs::set_category))
        // Content
        .route(
            "/images",
            post(content::upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/share", post(content::share));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        // Generated artifacts, read-only
        .nest_service("/files", ServeDir::new(output_root))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
