use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::artifact::audio_stem;

/// Identity of one transcription request.
///
/// Every transient file the request creates carries the id in its name, which
/// is the only thing keeping concurrent requests apart in the shared work
/// directory.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    started_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Extractor output template; the tool fills in `%(ext)s`
    pub fn audio_template(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(format!("{}.%(ext)s", audio_stem(&self.id)))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns every transient file of one session and deletes them on cleanup.
///
/// Cleanup is best effort: failures are logged and never returned. If the
/// guard is dropped without an explicit `cleanup` (cancelled request, panic),
/// `Drop` runs it.
#[derive(Debug)]
pub struct SessionFiles {
    work_dir: PathBuf,
    session_id: String,
    tracked: Vec<PathBuf>,
    cleaned: bool,
}

impl SessionFiles {
    pub fn new(work_dir: impl Into<PathBuf>, session: &Session) -> Self {
        Self {
            work_dir: work_dir.into(),
            session_id: session.id().to_string(),
            tracked: Vec::new(),
            cleaned: false,
        }
    }

    /// Register a file produced during this session
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.tracked.contains(&path) {
            self.tracked.push(path);
        }
    }

    pub fn tracked(&self) -> &[PathBuf] {
        &self.tracked
    }

    /// Delete one tracked file now
    pub fn remove(&mut self, path: &Path) {
        remove_best_effort(path);
        self.tracked.retain(|p| p != path);
    }

    /// Delete every tracked file, then any leftover file in the work
    /// directory whose name carries this session's id (partial downloads,
    /// intermediate formats). Returns how many files were deleted.
    ///
    /// Blocking; the pipeline runs it on the blocking pool. Only the `Drop`
    /// fallback calls it inline.
    pub fn cleanup(&mut self) -> usize {
        self.cleaned = true;
        let mut removed = 0;

        for path in std::mem::take(&mut self.tracked) {
            if remove_best_effort(&path) {
                removed += 1;
            }
        }

        let stem = audio_stem(&self.session_id);
        match fs::read_dir(&self.work_dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
                    if is_file && entry.file_name().to_string_lossy().contains(&stem) {
                        if remove_best_effort(&entry.path()) {
                            removed += 1;
                        }
                    }
                }
            }
            Err(e) => warn!(
                "Failed to scan {} for leftover files: {}",
                self.work_dir.display(),
                e
            ),
        }

        debug!("Session {}: removed {} transient files", self.session_id, removed);
        removed
    }
}

impl Drop for SessionFiles {
    fn drop(&mut self) {
        if !self.cleaned {
            self.cleanup();
        }
    }
}

/// Returns whether a file was actually deleted
fn remove_best_effort(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Failed to cleanup file: {} - {}", path.display(), e);
            false
        }
    }
}
