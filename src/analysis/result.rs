//! Pipeline result

use super::metadata::TranscriptionMetadata;
use super::score::Score;
use crate::features::pitch::PitchTrack;
use crate::features::steps::NoteSequence;

/// Every stage output of one transcription
#[derive(Debug, Clone)]
pub struct TranscriptionResult {
    /// Pitch and energy per analysis window
    pub pitch_track: PitchTrack,

    /// Segmented notes and rests
    pub steps: NoteSequence,

    /// Notated score
    pub score: Score,

    /// Run metadata
    pub metadata: TranscriptionMetadata,
}
