use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

use super::session::{Session, SessionFiles};
use super::state::PipelineState;
use crate::artifact::{self, TRANSCRIPT_EXTENSION};
use crate::config::{Config, PipelineConfig, ToolsConfig};
use crate::error::{Attempts, FailureKind, FormFailure, PipelineError, Stage};
use crate::process::{self, ProcessOutcome};
use crate::tools::{LocatedTool, ToolLocator, ToolSpec};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Result of a successful pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct Transcription {
    pub session_id: String,
    pub text: String,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
}

/// Runs video URL → audio → transcript for one request at a time.
///
/// A `Pipeline` holds only immutable configuration, so one instance can be
/// shared across concurrent requests.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    work_dir: PathBuf,
    extractor: ToolSpec,
    transcriber: ToolSpec,
    locator: ToolLocator,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, tools: &ToolsConfig) -> Self {
        Self {
            work_dir: config.work_dir(),
            locator: ToolLocator::new(config.probe_timeout()),
            extractor: ToolSpec::from(&tools.extractor),
            transcriber: ToolSpec::from(&tools.transcriber),
            config,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.pipeline.clone(), &cfg.tools)
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Transcribe the video at `url`.
    ///
    /// The URL is assumed to be validated by the caller. Every transient file
    /// created for this request is removed before returning, whatever the
    /// outcome.
    pub async fn transcribe(&self, url: &str) -> Result<Transcription, PipelineError> {
        let session = Session::new();
        let mut files = SessionFiles::new(&self.work_dir, &session);
        let mut progress = Progress::new(&session);

        info!("Starting transcription for session: {}", session.id());

        let result = self.run(url, &session, &mut files, &mut progress).await;
        if let Err(e) = tokio::task::spawn_blocking(move || files.cleanup()).await {
            warn!("Cleanup task for session {} failed: {}", session.id(), e);
        }

        match result {
            Ok(text) => {
                progress.advance(PipelineState::Done);
                let duration = Utc::now().signed_duration_since(session.started_at());
                Ok(Transcription {
                    session_id: session.id().to_string(),
                    text,
                    started_at: session.started_at(),
                    duration_secs: duration.num_milliseconds() as f64 / 1000.0,
                })
            }
            Err(e) => {
                progress.fail(&e);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        url: &str,
        session: &Session,
        files: &mut SessionFiles,
        progress: &mut Progress,
    ) -> Result<String, PipelineError> {
        let extractor = self.locator.locate(&self.extractor).await?;
        let transcriber = self.locator.locate(&self.transcriber).await?;
        progress.advance(PipelineState::ToolsChecked);

        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|source| PipelineError::WorkDir {
                path: self.work_dir.clone(),
                source,
            })?;

        progress.advance(PipelineState::AudioExtracting);
        let audio = self.extract_audio(&extractor, url, session).await?;
        files.track(&audio);
        info!("Audio extraction completed: {}", audio.display());
        progress.advance(PipelineState::AudioReady);

        self.check_audio_size(&audio).await?;

        progress.advance(PipelineState::Transcribing);
        let transcript = self.transcribe_audio(&transcriber, &audio).await?;
        files.track(&transcript);
        progress.advance(PipelineState::TranscriptReady);

        let text = tokio::fs::read_to_string(&transcript)
            .await
            .map_err(|source| PipelineError::TranscriptRead {
                path: transcript.clone(),
                source,
            })?;
        files.remove(&transcript);

        Ok(text.trim().to_string())
    }

    async fn extract_audio(
        &self,
        extractor: &LocatedTool,
        url: &str,
        session: &Session,
    ) -> Result<PathBuf, PipelineError> {
        let cfg = &self.config;
        let template = session.audio_template(&self.work_dir);
        let work_dir = self.work_dir.clone();
        let session_id = session.id().to_string();
        let extensions = cfg.audio_extensions.clone();
        let policy = cfg.match_policy;
        let args = vec![
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            cfg.audio_format.clone(),
            "--audio-quality".to_string(),
            cfg.audio_quality.clone(),
            "--postprocessor-args".to_string(),
            format!("ffmpeg:-t {}", cfg.max_audio_duration_secs),
            "--output".to_string(),
            template.to_string_lossy().into_owned(),
            "--no-playlist".to_string(),
            "--format".to_string(),
            cfg.format_selector.clone(),
            url.to_string(),
        ];

        self.run_stage(
            Stage::Extraction,
            extractor,
            &args,
            cfg.extract_timeout(),
            move || artifact::find_audio_artifact(&work_dir, &session_id, &extensions, policy),
        )
        .await
    }

    /// Refuse audio above the size limit before any transcriber is started
    async fn check_audio_size(&self, audio: &Path) -> Result<(), PipelineError> {
        let bytes = tokio::fs::metadata(audio)
            .await
            .map_err(|source| PipelineError::AudioMetadata {
                path: audio.to_path_buf(),
                source,
            })?
            .len();
        let size_mb = bytes / BYTES_PER_MB;
        info!("Audio file size: {} MB", size_mb);

        if size_mb > self.config.max_audio_mb {
            return Err(PipelineError::AudioTooLarge {
                size_mb,
                limit_mb: self.config.max_audio_mb,
            });
        }
        Ok(())
    }

    async fn transcribe_audio(
        &self,
        transcriber: &LocatedTool,
        audio: &Path,
    ) -> Result<PathBuf, PipelineError> {
        info!("Starting transcription of: {}", audio.display());

        let args = vec![
            audio.to_string_lossy().into_owned(),
            "--model".to_string(),
            self.config.model.clone(),
            "--output_format".to_string(),
            TRANSCRIPT_EXTENSION.to_string(),
            "--output_dir".to_string(),
            self.work_dir.to_string_lossy().into_owned(),
            "--verbose".to_string(),
            "True".to_string(),
        ];
        let work_dir = self.work_dir.clone();
        let audio = audio.to_path_buf();

        self.run_stage(
            Stage::Transcription,
            transcriber,
            &args,
            self.config.transcribe_timeout(),
            move || artifact::find_transcript_artifact(&work_dir, &audio),
        )
        .await
    }

    /// Try each invocation form in order until one exits cleanly and leaves
    /// an output file that `find` can locate. `find` scans the work directory
    /// with blocking calls, so it runs on the blocking pool.
    ///
    /// A timed-out form falls through like any other failure. When every form
    /// fails and at least one of them timed out, the stage reports a timeout
    /// carrying the partial output of the last one that did.
    async fn run_stage<F>(
        &self,
        stage: Stage,
        tool: &LocatedTool,
        args: &[String],
        deadline: Duration,
        find: F,
    ) -> Result<PathBuf, PipelineError>
    where
        F: Fn() -> std::io::Result<Option<PathBuf>> + Clone + Send + 'static,
    {
        let mut failures = Vec::new();

        for form in tool.invocation_order() {
            let cmd = form.command(&tool.name, args.iter().cloned());
            info!("Running {} via `{}`", stage, form);

            let result = match process::run(&cmd, deadline).await {
                Ok(result) => result,
                Err(e) => {
                    warn!("{} failed to start: {}, trying next...", form, e);
                    failures.push(FormFailure::new(form, FailureKind::Spawn(e.to_string())));
                    continue;
                }
            };

            let kind = match result.outcome() {
                ProcessOutcome::Success => {
                    let found = tokio::task::spawn_blocking(find.clone())
                        .await
                        .unwrap_or_else(|e| Err(std::io::Error::new(std::io::ErrorKind::Other, e)))
                        .map_err(|source| PipelineError::WorkDir {
                            path: self.work_dir.clone(),
                            source,
                        })?;
                    match found {
                        Some(path) => return Ok(path),
                        None => FailureKind::ArtifactMissing {
                            output: result.output,
                        },
                    }
                }
                ProcessOutcome::Failed { code } => FailureKind::Exit {
                    code,
                    output: result.output,
                },
                ProcessOutcome::TimedOut => FailureKind::TimedOut {
                    output: result.output,
                },
            };

            warn!("{} failed, trying next...", form);
            failures.push(FormFailure::new(form, kind));
        }

        let timed_out = failures.iter().rev().find_map(|f| match &f.kind {
            FailureKind::TimedOut { output } => Some(output.clone()),
            _ => None,
        });
        if let Some(output) = timed_out {
            return Err(PipelineError::Timeout {
                stage,
                deadline,
                output,
            });
        }

        Err(PipelineError::StageFailed {
            stage,
            attempts: Attempts(failures),
        })
    }
}

/// Tracks and logs the request's position in the state machine
struct Progress {
    session_id: String,
    state: PipelineState,
}

impl Progress {
    fn new(session: &Session) -> Self {
        Self {
            session_id: session.id().to_string(),
            state: PipelineState::Init,
        }
    }

    fn advance(&mut self, to: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(to),
            "invalid transition {} -> {}",
            self.state,
            to
        );
        info!("Session {}: {} -> {}", self.session_id, self.state, to);
        self.state = to;
    }

    fn fail(&mut self, err: &PipelineError) {
        error!(
            "Session {} failed in state {}: {}",
            self.session_id, self.state, err
        );
        self.state = PipelineState::Error;
    }
}
