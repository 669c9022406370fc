use std::fmt;

/// States of a single transcription request.
///
/// ```text
/// Init ──tools found──▶ ToolsChecked ──▶ AudioExtracting ──▶ AudioReady
///      ──▶ Transcribing ──▶ TranscriptReady ──▶ Done
/// any state ──error──▶ Error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    ToolsChecked,
    AudioExtracting,
    AudioReady,
    Transcribing,
    TranscriptReady,
    Done,
    Error,
}

impl PipelineState {
    /// The state that follows this one on the success path
    pub fn next(&self) -> Option<PipelineState> {
        use PipelineState::*;
        match self {
            Init => Some(ToolsChecked),
            ToolsChecked => Some(AudioExtracting),
            AudioExtracting => Some(AudioReady),
            AudioReady => Some(Transcribing),
            Transcribing => Some(TranscriptReady),
            TranscriptReady => Some(Done),
            Done | Error => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Error)
    }

    pub fn can_transition_to(&self, to: PipelineState) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == PipelineState::Error || self.next() == Some(to)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
