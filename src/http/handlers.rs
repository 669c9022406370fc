use super::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TranscribeParams {
    /// Video page URL
    #[serde(rename = "youtubeUrl")]
    pub youtube_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub success: bool,
    pub transcription: String,
    pub session_id: String,
    pub duration_secs: f64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// URL shapes accepted from clients
const VIDEO_URL_PATTERNS: &[&str] = &["youtube.com/watch?v=", "youtu.be/", "youtube.com/embed/"];

pub fn is_valid_video_url(url: &str) -> bool {
    VIDEO_URL_PATTERNS.iter().any(|pattern| url.contains(pattern))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /transcribe?youtubeUrl=...
/// Extract the video's audio and return its transcription
pub async fn transcribe(
    State(state): State<AppState>,
    Query(params): Query<TranscribeParams>,
) -> impl IntoResponse {
    let url = match params.youtube_url {
        Some(url) if is_valid_video_url(&url) => url,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Invalid YouTube URL")),
            )
                .into_response();
        }
    };

    info!("Transcription requested for {}", url);

    match state.pipeline.transcribe(&url).await {
        Ok(result) => {
            info!(
                "Session {} transcribed {} characters in {:.1}s",
                result.session_id,
                result.text.len(),
                result.duration_secs
            );
            (
                StatusCode::OK,
                Json(TranscribeResponse {
                    success: true,
                    transcription: result.text,
                    session_id: result.session_id,
                    duration_secs: result.duration_secs,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Transcription failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(format!("Error processing video: {}", e))),
            )
                .into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
