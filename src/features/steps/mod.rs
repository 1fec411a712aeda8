//! Note segmentation
//!
//! Turns a continuous [`PitchTrack`](crate::features::pitch::PitchTrack) into
//! discrete notes and rests:
//!
//! 1. [`segmenter::StepSegmenter`] masks unreliable samples (NaN or negative
//!    values, energy-based voice activity, out-of-range pitch, explicit mask)
//! 2. Contiguous unmasked runs ("voiced groups") are detected
//! 3. A [`SegmentationStrategy`] quantizes each group into constant-pitch runs
//! 4. Runs become [`AnalogNote`]s, with rests inserted between groups

pub mod histogram;
pub mod segmenter;
pub mod threshold;

pub use histogram::HistogramSegmentation;
pub use segmenter::StepSegmenter;

use crate::config::StepConfig;
use crate::error::Result;

/// One note or rest with its measured duration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalogNote {
    /// False for rests
    pub is_a_note: bool,
    /// Duration in seconds
    pub length_s: f64,
    /// Pitch in semitones, NaN for rests
    pub pitch_st: f64,
    /// Mean energy over the note, NaN when unavailable
    pub energy: f64,
    /// True when the note directly follows the previous one in the same voiced group
    pub linked: bool,
}

impl AnalogNote {
    /// A pitched note
    pub fn note(length_s: f64, pitch_st: f64, energy: f64, linked: bool) -> Self {
        Self {
            is_a_note: true,
            length_s,
            pitch_st,
            energy,
            linked,
        }
    }

    /// A rest
    pub fn rest(length_s: f64) -> Self {
        Self {
            is_a_note: false,
            length_s,
            pitch_st: f64::NAN,
            energy: f64::NAN,
            linked: false,
        }
    }
}

/// Ordered notes and rests starting at `offset_s`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteSequence {
    /// Start time of the first note in seconds
    pub offset_s: f64,
    /// Notes and rests in time order
    pub notes: Vec<AnalogNote>,
}

impl NoteSequence {
    /// Total duration of the notes and rests in seconds
    pub fn duration_s(&self) -> f64 {
        self.notes.iter().map(|n| n.length_s).sum()
    }

    /// Pitches of the pitched notes, in order
    pub fn pitches(&self) -> Vec<f64> {
        self.notes
            .iter()
            .filter(|n| n.is_a_note)
            .map(|n| n.pitch_st)
            .collect()
    }
}

/// Run of `count` consecutive samples quantized to `pitch_st`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepRun {
    /// Number of samples
    pub count: usize,
    /// Quantized pitch in semitones
    pub pitch_st: f64,
}

/// Quantization of one voiced group into constant-pitch runs
pub trait SegmentationStrategy: Send + Sync {
    /// Run-length encoded pitch levels of `pitch`
    ///
    /// The counts sum to `pitch.len()`.
    fn recover_steps(&self, pitch: &[f64], period_s: f64, params: &StepConfig) -> Result<Vec<StepRun>>;
}
