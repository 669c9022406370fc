use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Pipeline stage that runs an external tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ToolCheck,
    Extraction,
    Transcription,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ToolCheck => "tool check",
            Stage::Extraction => "audio extraction",
            Stage::Transcription => "transcription",
        };
        f.write_str(name)
    }
}

/// Why a single invocation form did not produce a usable result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The process could not be started at all
    Spawn(String),
    /// The process exited with a nonzero status
    Exit { code: Option<i32>, output: String },
    /// The process was killed at its deadline
    TimedOut { output: String },
    /// The process succeeded but left no recognisable output file
    ArtifactMissing { output: String },
}

/// One failed attempt in an ordered fallback over invocation forms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFailure {
    /// The form as it would be typed in a shell
    pub form: String,
    pub kind: FailureKind,
}

impl FormFailure {
    pub fn new(form: impl fmt::Display, kind: FailureKind) -> Self {
        Self {
            form: form.to_string(),
            kind,
        }
    }

    /// Captured process output, if the process got far enough to produce any
    pub fn output(&self) -> Option<&str> {
        match &self.kind {
            FailureKind::Spawn(_) => None,
            FailureKind::Exit { output, .. }
            | FailureKind::TimedOut { output }
            | FailureKind::ArtifactMissing { output } => Some(output),
        }
    }
}

impl fmt::Display for FormFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FailureKind::Spawn(e) => {
                return write!(f, "`{}` could not be started: {}", self.form, e)
            }
            FailureKind::Exit { code: Some(code), .. } => {
                write!(f, "`{}` exited with code {}", self.form, code)?
            }
            FailureKind::Exit { code: None, .. } => {
                write!(f, "`{}` was terminated by a signal", self.form)?
            }
            FailureKind::TimedOut { .. } => write!(f, "`{}` timed out", self.form)?,
            FailureKind::ArtifactMissing { .. } => {
                write!(f, "`{}` finished but its output file was not found", self.form)?
            }
        }
        match self.output().map(str::trim) {
            Some(output) if !output.is_empty() => write!(f, ". Output: {}", output),
            _ => Ok(()),
        }
    }
}

/// Every failed attempt of one fallback search, in the order they were tried
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attempts(pub Vec<FormFailure>);

impl Attempts {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormFailure> {
        self.0.iter()
    }
}

impl fmt::Display for Attempts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("no invocation forms configured");
        }
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{tool} is not installed. {hint} (tried: {attempts})")]
    ToolUnavailable {
        tool: String,
        hint: String,
        attempts: Attempts,
    },

    #[error("{stage} failed: {attempts}")]
    StageFailed { stage: Stage, attempts: Attempts },

    #[error("Audio file too large ({size_mb} MB, limit {limit_mb} MB). Try a shorter video.")]
    AudioTooLarge { size_mb: u64, limit_mb: u64 },

    #[error("{stage} timed out after {} seconds. Output: {output}", .deadline.as_secs())]
    Timeout {
        stage: Stage,
        deadline: Duration,
        output: String,
    },

    #[error("Failed to inspect audio file {}: {source}", .path.display())]
    AudioMetadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read transcript {}: {source}", .path.display())]
    TranscriptRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to scan work directory {}: {source}", .path.display())]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Stage the request was in when it failed
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::ToolUnavailable { .. } => Stage::ToolCheck,
            PipelineError::StageFailed { stage, .. } | PipelineError::Timeout { stage, .. } => {
                *stage
            }
            PipelineError::AudioTooLarge { .. }
            | PipelineError::AudioMetadata { .. }
            | PipelineError::TranscriptRead { .. } => Stage::Transcription,
            PipelineError::WorkDir { .. } => Stage::Extraction,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PipelineError::Timeout { .. })
    }

    /// Configuration errors mean a tool is missing, not that the input was bad
    pub fn is_configuration(&self) -> bool {
        matches!(self, PipelineError::ToolUnavailable { .. })
    }
}
