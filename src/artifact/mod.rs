//! Discovery of files written by external tools
//!
//! The tools write their results to disk instead of returning paths, so each
//! stage finds its output by name pattern in the work directory.

mod finder;

pub use finder::{
    audio_stem, find_audio_artifact, find_transcript_artifact, MatchPolicy, AUDIO_PREFIX,
    TRANSCRIPT_EXTENSION,
};
