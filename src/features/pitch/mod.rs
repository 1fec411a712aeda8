//! Pitch tracking
//!
//! A [`PitchEstimator`] turns one window of samples into a frequency estimate.
//! The [`tracker::PitchTrackBuilder`] slides windows over an audio source and
//! collects per-window pitch (semitones) and energy into a [`PitchTrack`].

pub mod mcleod;
pub mod tracker;

pub use mcleod::McLeodPitch;
pub use tracker::PitchTrackBuilder;

use crate::error::{Result, TranscriptionError};

/// Single-window frequency estimator
///
/// Implementations are pure functions of their input and are shared across
/// worker threads.
pub trait PitchEstimator: Send + Sync {
    /// Frequency of `window` in Hz, or `None` when no reliable pitch is found
    fn estimate(&self, window: &[f32], sample_rate_hz: f64) -> Option<f64>;
}

/// Per-window pitch and energy of an audio excerpt
///
/// Sample `k` describes the window starting at `offset_s + k * period_s`.
/// NaN marks a missing value. `energy` is either empty or as long as `pitch_st`.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchTrack {
    /// Time between successive samples in seconds
    pub period_s: f64,
    /// Frequency of the 0 semitone
    pub reference_pitch_hz: f64,
    /// Time of the first sample in seconds
    pub offset_s: f64,
    /// Pitch in semitones above the reference, NaN when undetected
    pub pitch_st: Vec<f64>,
    /// Mean squared amplitude of each window, NaN when unavailable
    pub energy: Vec<f64>,
}

impl PitchTrack {
    /// Build a validated track
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the period or the reference pitch is not
    /// positive, or if a non-empty `energy` does not match `pitch_st` in length
    pub fn new(
        period_s: f64,
        reference_pitch_hz: f64,
        offset_s: f64,
        pitch_st: Vec<f64>,
        energy: Vec<f64>,
    ) -> Result<Self> {
        let track = Self {
            period_s,
            reference_pitch_hz,
            offset_s,
            pitch_st,
            energy,
        };
        track.validate()?;
        Ok(track)
    }

    /// Check the track invariants
    pub fn validate(&self) -> Result<()> {
        if !(self.period_s > 0.0) {
            return Err(TranscriptionError::InvalidInput(format!(
                "Pitch track period must be positive, got {}",
                self.period_s
            )));
        }
        if !(self.reference_pitch_hz > 0.0) {
            return Err(TranscriptionError::InvalidInput(format!(
                "Reference pitch must be positive, got {}",
                self.reference_pitch_hz
            )));
        }
        if !self.energy.is_empty() && self.energy.len() != self.pitch_st.len() {
            return Err(TranscriptionError::InvalidInput(format!(
                "Pitch and energy lengths differ: {} vs {}",
                self.pitch_st.len(),
                self.energy.len()
            )));
        }
        Ok(())
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.pitch_st.len()
    }

    /// True when the track holds no sample
    pub fn is_empty(&self) -> bool {
        self.pitch_st.is_empty()
    }

    /// True when energy values are present
    pub fn has_energy(&self) -> bool {
        !self.energy.is_empty()
    }

    /// Time span covered by the samples in seconds
    pub fn duration_s(&self) -> f64 {
        self.pitch_st.len() as f64 * self.period_s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_validation() {
        assert!(PitchTrack::new(0.01, 32.7, 0.0, vec![1.0, 2.0], vec![0.1, 0.2]).is_ok());
        assert!(PitchTrack::new(0.01, 32.7, 0.0, vec![1.0, 2.0], vec![]).is_ok());
        assert!(PitchTrack::new(0.01, 32.7, 0.0, vec![1.0, 2.0], vec![0.1]).is_err());
        assert!(PitchTrack::new(0.0, 32.7, 0.0, vec![1.0], vec![]).is_err());
        assert!(PitchTrack::new(0.01, -1.0, 0.0, vec![1.0], vec![]).is_err());
    }

    #[test]
    fn test_track_duration() {
        let track = PitchTrack::new(0.01, 32.7, 1.0, vec![f64::NAN; 50], vec![]).unwrap();
        assert!((track.duration_s() - 0.5).abs() < 1e-12);
        assert!(!track.has_energy());
        assert_eq!(track.len(), 50);
    }
}
