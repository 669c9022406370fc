pub mod artifact;
pub mod config;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod process;
pub mod tools;

pub use config::Config;
pub use error::{PipelineError, Stage};
pub use http::{create_router, AppState};
pub use pipeline::{Pipeline, PipelineState, Session, Transcription};
pub use tools::{InvocationForm, LocatedTool, ToolLocator, ToolSpec};
