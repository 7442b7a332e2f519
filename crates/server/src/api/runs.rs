//! Run control API handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use newsreel_core::{Category, ImageSource, OrchestratorError, RunRequest, RunSnapshot};

use super::{error_response, ErrorResponse};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    /// Whether a run was active when the request arrived.
    pub cancelling: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryBody {
    pub category: Category,
}

// ============================================================================
// Handlers
// ============================================================================

/// Start a run
pub async fn start_run(
    State(state): State<Arc<AppState>>,
    Json(mut request): Json<RunRequest>,
) -> Result<(StatusCode, Json<RunSnapshot>), (StatusCode, Json<ErrorResponse>)> {
    if request.category.is_none() {
        request.category = Some(state.default_category().await);
    }

    // Only images previously stored through the upload endpoint may be used.
    if let Some(ImageSource::Upload { path }) = request.image_source.clone() {
        let resolved = state
            .orchestrator()
            .store()
            .resolve_upload(&path)
            .await
            .map_err(|e| {
                warn!("Rejected run image {:?}: {}", path, e);
                error_response(StatusCode::BAD_REQUEST, e.to_string())
            })?;
        request.image_source = Some(ImageSource::Upload { path: resolved });
    }

    match state.orchestrator().start_run(request) {
        Ok(snapshot) => Ok((StatusCode::ACCEPTED, Json(snapshot))),
        Err(e @ OrchestratorError::AlreadyRunning) => {
            Err(error_response(StatusCode::CONFLICT, e.to_string()))
        }
        Err(e) => Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            e.to_string(),
        )),
    }
}

/// Request cancellation of the active run
pub async fn cancel_run(State(state): State<Arc<AppState>>) -> Json<CancelResponse> {
    let cancelling = state.orchestrator().request_cancel();
    let message = if cancelling {
        "Stopping..."
    } else {
        "No run in progress"
    };
    Json(CancelResponse {
        cancelling,
        message: message.to_string(),
    })
}

/// Current run snapshot
pub async fn get_progress(State(state): State<Arc<AppState>>) -> Json<RunSnapshot> {
    Json(state.orchestrator().read_progress())
}

pub async fn get_category(State(state): State<Arc<AppState>>) -> Json<CategoryBody> {
    Json(CategoryBody {
        category: state.default_category().await,
    })
}

pub async fn set_category(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CategoryBody>,
) -> impl IntoResponse {
    state.set_default_category(body.category).await;
    info!("Default category set to {}", body.category);
    Json(body)
}
