//! Transcription pipeline
//!
//! This module ties the pieces together for one request:
//! - Tool discovery for the extractor and the transcriber
//! - Audio extraction into a session-scoped file
//! - Size check, then transcription into a text file
//! - Unconditional cleanup of every transient file

mod orchestrator;
mod session;
mod state;

pub use orchestrator::{Pipeline, Transcription};
pub use session::{Session, SessionFiles};
pub use state::PipelineState;
