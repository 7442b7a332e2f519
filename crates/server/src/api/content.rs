//! Image upload and share-text handlers.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use newsreel_core::StorageError;

use super::{error_response, ErrorResponse};
use crate::state::AppState;

/// Twitter post length limit, in characters.
const TWITTER_MAX_CHARS: usize = 280;

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct ShareRequest {
    pub platform: String,
    pub script_path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub platform: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Store an uploaded image (multipart field `image`).
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))?;
        if bytes.is_empty() {
            return Err(error_response(StatusCode::BAD_REQUEST, "No image selected"));
        }

        let path = state
            .orchestrator()
            .store()
            .save_upload(&bytes, Utc::now())
            .await
            .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

        info!("Stored uploaded image at {:?}", path);
        return Ok(Json(UploadResponse {
            message: "Image uploaded successfully".to_string(),
            path,
        }));
    }

    Err(error_response(
        StatusCode::BAD_REQUEST,
        "No image file provided",
    ))
}

/// Prepare a script for sharing on a social platform.
pub async fn share(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ShareRequest>,
) -> Result<Json<ShareResponse>, ApiError> {
    let platform = request.platform.to_lowercase();
    if platform != "twitter" && platform != "tiktok" {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("Unsupported platform: {}", request.platform),
        ));
    }

    let script = state
        .orchestrator()
        .store()
        .read_text_within(&request.script_path)
        .await
        .map_err(|e| match e {
            StorageError::OutsideRoot { .. } => {
                warn!("Rejected share of {:?}", request.script_path);
                error_response(StatusCode::BAD_REQUEST, e.to_string())
            }
            StorageError::Io { .. } => error_response(StatusCode::NOT_FOUND, e.to_string()),
        })?;

    let response = if platform == "twitter" {
        ShareResponse {
            platform,
            message: "Copy this text to share on Twitter".to_string(),
            text: Some(script.chars().take(TWITTER_MAX_CHARS).collect()),
        }
    } else {
        ShareResponse {
            platform,
            message: "Export as MP4 first, then upload to TikTok".to_string(),
            text: None,
        }
    };

    Ok(Json(response))
}
