use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::artifact::MatchPolicy;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub pipeline: PipelineConfig,
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    /// Default log filter, overridden by `RUST_LOG`
    pub log_level: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "vidscribe".to_string(),
            log_level: "info".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Settings for one pipeline run
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory for transient audio/transcript files.
    /// Defaults to the platform temp directory.
    pub work_dir: Option<PathBuf>,

    /// Wait for each tool probe
    pub probe_timeout_secs: u64,

    /// Wait for one audio extraction run
    pub extract_timeout_secs: u64,

    /// Wait for one transcription run
    pub transcribe_timeout_secs: u64,

    /// Audio files larger than this (whole MiB) are never transcribed
    pub max_audio_mb: u64,

    /// Extracted audio is cut to this many seconds by the post-processor
    pub max_audio_duration_secs: u64,

    pub audio_format: String,
    pub audio_quality: String,

    /// Source stream selector passed to the extractor
    pub format_selector: String,

    /// Transcriber model identifier
    pub model: String,

    /// Extensions accepted as the extractor's output
    pub audio_extensions: Vec<String>,

    pub match_policy: MatchPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: None,
            probe_timeout_secs: 10,
            extract_timeout_secs: 600,
            transcribe_timeout_secs: 1800,
            max_audio_mb: 100,
            max_audio_duration_secs: 600,
            audio_format: "wav".to_string(),
            audio_quality: "0".to_string(),
            format_selector: "140".to_string(),
            model: "base".to_string(),
            audio_extensions: vec!["wav".to_string(), "mp3".to_string()],
            match_policy: MatchPolicy::Strict,
        }
    }
}

impl PipelineConfig {
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.extract_timeout_secs)
    }

    pub fn transcribe_timeout(&self) -> Duration {
        Duration::from_secs(self.transcribe_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub extractor: ToolConfig,
    pub transcriber: ToolConfig,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            extractor: ToolConfig::yt_dlp(),
            transcriber: ToolConfig::whisper(),
        }
    }
}

/// How to find and invoke one external tool
#[derive(Debug, Clone, Deserialize)]
pub struct ToolConfig {
    /// Logical tool name used in logs and errors
    pub name: String,

    /// Arguments for the availability probe
    pub probe_args: Vec<String>,

    /// Candidate invocation forms in priority order.
    /// Each entry is a program followed by its leading arguments; `~` is expanded.
    pub forms: Vec<Vec<String>>,

    /// Importable module checked with `<interpreter> -c "import <module>"`
    /// once every form has failed
    #[serde(default)]
    pub library_module: Option<String>,

    #[serde(default)]
    pub interpreters: Vec<String>,

    #[serde(default)]
    pub install_hint: String,
}

impl ToolConfig {
    pub fn yt_dlp() -> Self {
        Self {
            name: "yt-dlp".to_string(),
            probe_args: vec!["--version".to_string()],
            forms: default_forms("yt-dlp", "yt_dlp"),
            library_module: None,
            interpreters: default_interpreters(),
            install_hint: "Please install it with: pip install yt-dlp".to_string(),
        }
    }

    pub fn whisper() -> Self {
        Self {
            name: "whisper".to_string(),
            probe_args: vec!["--help".to_string()],
            forms: default_forms("whisper", "whisper"),
            library_module: Some("whisper".to_string()),
            interpreters: default_interpreters(),
            install_hint: "Please install it with: pip install openai-whisper".to_string(),
        }
    }
}

fn default_interpreters() -> Vec<String> {
    vec!["python".to_string(), "python3".to_string()]
}

fn default_forms(command: &str, module: &str) -> Vec<Vec<String>> {
    vec![
        vec![command.to_string()],
        vec!["python".to_string(), "-m".to_string(), module.to_string()],
        vec!["python3".to_string(), "-m".to_string(), module.to_string()],
        vec![format!("/usr/local/bin/{}", command)],
        vec![format!("~/.local/bin/{}", command)],
    ]
}

impl Config {
    /// Load from an optional config file, then `VIDSCRIBE__*` environment overrides
    /// (e.g. `VIDSCRIBE__PIPELINE__MODEL=small`).
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("VIDSCRIBE").separator("__"))
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }
}
