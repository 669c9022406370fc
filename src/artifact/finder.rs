use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Filename prefix of every audio file the extractor writes
pub const AUDIO_PREFIX: &str = "audio_";

/// Extension the transcriber uses for plain-text output
pub const TRANSCRIPT_EXTENSION: &str = "txt";

/// How far the audio lookup may stray from session-qualified names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Only files whose name carries the session identifier
    #[default]
    Strict,
    /// Fall back to any `audio_*` file with an accepted extension.
    /// Can pick up stale files or another session's output.
    Loose,
}

/// Name stem (without extension) of the session's audio file
pub fn audio_stem(session_id: &str) -> String {
    format!("{}{}", AUDIO_PREFIX, session_id)
}

/// Locate the audio file the extractor produced for `session_id`.
///
/// Returns `Ok(None)` when no file matches; `Err` only if `dir` can't be read.
/// Reads the directory with blocking calls; async callers go through
/// `spawn_blocking`.
pub fn find_audio_artifact(
    dir: &Path,
    session_id: &str,
    extensions: &[String],
    policy: MatchPolicy,
) -> io::Result<Option<PathBuf>> {
    let names = sorted_file_names(dir)?;
    let stem = audio_stem(session_id);

    let strict = names
        .iter()
        .find(|name| name.contains(&stem) && has_extension(name, extensions));
    if let Some(name) = strict {
        return Ok(Some(dir.join(name)));
    }

    if policy == MatchPolicy::Loose {
        let loose = names
            .iter()
            .find(|name| name.starts_with(AUDIO_PREFIX) && has_extension(name, extensions));
        if let Some(name) = loose {
            tracing::warn!(
                "No audio file for session {}, falling back to {}",
                session_id,
                name
            );
            return Ok(Some(dir.join(name)));
        }
    }

    Ok(None)
}

/// Locate the transcript the transcriber wrote for `audio_path`.
///
/// The transcript shares the audio file's base name and ends in `.txt`.
pub fn find_transcript_artifact(dir: &Path, audio_path: &Path) -> io::Result<Option<PathBuf>> {
    let base = match base_name(audio_path) {
        Some(base) => base,
        None => return Ok(None),
    };
    let extensions = [TRANSCRIPT_EXTENSION.to_string()];

    Ok(sorted_file_names(dir)?
        .into_iter()
        .find(|name| name.starts_with(&base) && has_extension(name, &extensions))
        .map(|name| dir.join(name)))
}

/// File name with its last extension removed (`audio_x.wav` → `audio_x`).
/// A leading dot is part of the name, not an extension.
fn base_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    match name.rfind('.') {
        Some(dot) if dot > 0 => Some(name[..dot].to_string()),
        _ => Some(name.into_owned()),
    }
}

fn has_extension(name: &str, extensions: &[String]) -> bool {
    extensions.iter().any(|ext| {
        name.len() > ext.len() + 1
            && name.ends_with(ext.as_str())
            && name.as_bytes()[name.len() - ext.len() - 1] == b'.'
    })
}

/// Regular files in `dir`, sorted by name so lookups are deterministic
fn sorted_file_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}
