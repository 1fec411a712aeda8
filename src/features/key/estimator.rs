//! Key signature, clef and mode estimation
//!
//! # Algorithm
//!
//! 1. Tuning: test offsets from -0.5 to 0.5 st by 0.005 st and keep the one
//!    minimizing the total distance of `pitch + offset` to whole semitones
//! 2. Every adjusted pitch becomes a (pitch class, octave) pair
//! 3. Key signature: the signature (in 0, 1, -1, 2, -2, ... order) with the
//!    fewest pitch classes outside its diatonic scale
//! 4. Clef: treble if the median absolute height reaches C5, bass otherwise
//! 5. Mode: major when the first or last note is the major tonic, minor when
//!    the first note is the minor tonic or its leading tone, or the last note
//!    is the minor tonic; major otherwise

use super::spelling::{is_height_in_key, major_tonic_height, minor_tonic_height, spell};
use super::{Clef, KeyContext, Mode, NotatedPitch};
use crate::error::{Result, TranscriptionError};
use crate::features::steps::NoteSequence;

const OFFSET_RESOLUTION_ST: f64 = 0.005;
const FIFTHS_SEARCH_ORDER: [i8; 15] = [0, 1, -1, 2, -2, 3, -3, 4, -4, 5, -5, 6, -6, 7, -7];
/// Four octaves above the C1 reference
const TREBLE_MEDIAN_MIN: i32 = 48;

/// Pitch class (0 = C) and octave relative to the reference pitch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeightOctave {
    height: u8,
    octave: i32,
}

impl HeightOctave {
    fn absolute(&self) -> i32 {
        self.octave * 12 + self.height as i32
    }
}

/// Key estimator holding the last fitted [`KeyContext`]
///
/// # Example
///
/// ```
/// use scorelisto::features::key::KeyEstimator;
///
/// // D major scale starting on D3
/// let pitches = [26.0, 28.0, 30.0, 31.0, 33.0, 35.0, 37.0, 38.0];
/// let mut estimator = KeyEstimator::new();
/// let key = estimator.fit(&pitches)?;
/// assert_eq!(key.fifths, 2);
/// assert_eq!(estimator.transform(30.0).name(), "F#3");
/// # Ok::<(), scorelisto::TranscriptionError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct KeyEstimator {
    context: KeyContext,
}

impl KeyEstimator {
    /// Estimator in C major, treble clef, without tuning offset
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimator using an already known key
    pub fn with_context(context: KeyContext) -> Self {
        Self { context }
    }

    /// Current key
    pub fn context(&self) -> &KeyContext {
        &self.context
    }

    /// Fit the key to the pitched notes of a sequence
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the sequence holds no pitched note
    pub fn fit_sequence(&mut self, sequence: &NoteSequence) -> Result<KeyContext> {
        self.fit(&sequence.pitches())
    }

    /// Fit the key to note pitches in semitones above the reference
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `pitches` is empty or holds a non-finite value
    pub fn fit(&mut self, pitches_st: &[f64]) -> Result<KeyContext> {
        log::debug!("Fitting key over {} pitches", pitches_st.len());
        if pitches_st.is_empty() {
            return Err(TranscriptionError::InvalidInput(
                "Cannot estimate the key without notes".to_string(),
            ));
        }
        if let Some(bad) = pitches_st.iter().find(|p| !p.is_finite()) {
            return Err(TranscriptionError::InvalidInput(format!(
                "Note pitch must be finite, got {}",
                bad
            )));
        }

        let offset_st = optimum_offset(pitches_st);
        let notes: Vec<HeightOctave> = pitches_st
            .iter()
            .map(|&p| height_and_octave(p, offset_st))
            .collect();
        let fifths = best_fifths(&notes);
        let clef = if median_height(&notes) >= TREBLE_MEDIAN_MIN {
            Clef::G
        } else {
            Clef::F
        };
        let mode = find_mode(&notes, fifths);

        self.context = KeyContext {
            offset_st,
            fifths,
            clef,
            mode,
        };
        log::debug!(
            "Key {} ({} fifths), offset {:.3} st, {:?} clef",
            self.context.name(),
            fifths,
            offset_st,
            clef
        );
        Ok(self.context)
    }

    /// Spell `pitch_st` under the current key
    pub fn transform(&self, pitch_st: f64) -> NotatedPitch {
        let note = height_and_octave(pitch_st, self.context.offset_st);
        // Octave 0 of the C1 reference is octave 1 in scientific numbering
        spell(note.height, note.octave + 1, self.context.fifths)
    }
}

fn optimum_offset(pitches_st: &[f64]) -> f64 {
    let nb_offsets = (1.0 / OFFSET_RESOLUTION_ST).floor() as usize;
    let mut best = (0.0, f64::MAX);
    for k in 0..nb_offsets {
        let offset = -0.5 + k as f64 * OFFSET_RESOLUTION_ST;
        let error: f64 = pitches_st
            .iter()
            .map(|p| {
                let shifted = p + offset;
                (shifted - shifted.round()).abs()
            })
            .sum();
        if error < best.1 {
            best = (offset, error);
        }
    }
    best.0
}

fn height_and_octave(pitch_st: f64, offset_st: f64) -> HeightOctave {
    let pitch = pitch_st + offset_st;
    let octave = (pitch / 12.0).floor() as i32;
    let height = pitch.rem_euclid(12.0);
    if height >= 11.5 {
        HeightOctave { height: 0, octave: octave + 1 }
    } else {
        HeightOctave {
            height: height.round() as u8,
            octave,
        }
    }
}

fn best_fifths(notes: &[HeightOctave]) -> i8 {
    let mut best = (0, usize::MAX);
    for &fifths in &FIFTHS_SEARCH_ORDER {
        let outside = notes.iter().filter(|n| !is_height_in_key(n.height, fifths)).count();
        if outside < best.1 {
            best = (fifths, outside);
        }
    }
    best.0
}

fn median_height(notes: &[HeightOctave]) -> i32 {
    let mut heights: Vec<i32> = notes.iter().map(HeightOctave::absolute).collect();
    heights.sort_unstable();
    let size = heights.len();
    if size % 2 == 1 {
        heights[size / 2]
    } else {
        (heights[size / 2 - 1] + heights[size / 2]) / 2
    }
}

fn find_mode(notes: &[HeightOctave], fifths: i8) -> Mode {
    let (Some(first), Some(last)) = (notes.first(), notes.last()) else {
        return Mode::Major;
    };
    let major = major_tonic_height(fifths);
    let minor = minor_tonic_height(fifths);
    let leading_tone = (minor + 11) % 12;
    if first.height == major || last.height == major {
        Mode::Major
    } else if first.height == minor || first.height == leading_tone || last.height == minor {
        Mode::Minor
    } else {
        Mode::Major
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::key::{Alter, Step};

    #[test]
    fn test_rejects_empty_and_nan() {
        let mut estimator = KeyEstimator::new();
        assert!(estimator.fit(&[]).is_err());
        assert!(estimator.fit(&[40.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_tuning_offset_compensates_detune() {
        let pitches: Vec<f64> = [36.0, 38.0, 40.0, 41.0, 43.0].iter().map(|p| p + 0.2).collect();
        let key = KeyEstimator::new().fit(&pitches).unwrap();
        assert!((key.offset_st + 0.2).abs() < 0.006, "Offset {}", key.offset_st);
        assert_eq!(key.fifths, 0);
    }

    #[test]
    fn test_flat_key() {
        // E flat major scale from E flat 5
        let pitches = [51.0, 53.0, 55.0, 56.0, 58.0, 60.0, 62.0, 63.0];
        let mut estimator = KeyEstimator::new();
        let key = estimator.fit(&pitches).unwrap();
        assert_eq!(key.fifths, -3);
        assert_eq!(key.mode, Mode::Major);
        assert_eq!(key.clef, Clef::G);
        let pitch = estimator.transform(58.0);
        assert_eq!((pitch.step, pitch.alter, pitch.octave), (Step::B, Alter::Flat, 5));
    }

    #[test]
    fn test_minor_mode_and_bass_clef() {
        // A minor melody starting and ending on A2 with a G sharp leading tone
        let pitches = [21.0, 23.0, 24.0, 26.0, 28.0, 29.0, 31.0, 32.0, 21.0];
        let key = KeyEstimator::new().fit(&pitches).unwrap();
        assert_eq!(key.fifths, 0);
        assert_eq!(key.mode, Mode::Minor);
        assert_eq!(key.clef, Clef::F);
        assert_eq!(key.name(), "Am");
    }

    #[test]
    fn test_clef_threshold_is_c5() {
        assert_eq!(KeyEstimator::new().fit(&[48.0]).unwrap().clef, Clef::G);
        assert_eq!(KeyEstimator::new().fit(&[47.0]).unwrap().clef, Clef::F);
        // Even count uses the mean of the two middle heights, rounded down
        assert_eq!(KeyEstimator::new().fit(&[47.0, 48.0]).unwrap().clef, Clef::F);
    }

    #[test]
    fn test_height_wraps_to_next_octave() {
        let note = height_and_octave(23.6, 0.0);
        assert_eq!(note, HeightOctave { height: 0, octave: 2 });
        let note = height_and_octave(-1.0, 0.0);
        assert_eq!(note, HeightOctave { height: 11, octave: -1 });
    }

    #[test]
    fn test_transform_middle_c() {
        let estimator = KeyEstimator::new();
        assert_eq!(estimator.transform(36.0).name(), "C4");
        assert_eq!(estimator.transform(42.0).name(), "F#4");
        assert_eq!(estimator.transform(0.0).name(), "C1");
    }
}
