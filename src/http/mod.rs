//! HTTP API
//!
//! - POST /transcribe?youtubeUrl=... - Transcribe a video's audio track
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::is_valid_video_url;
pub use routes::create_router;
pub use state::AppState;
