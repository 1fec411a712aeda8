//! Persisted stage outputs
//!
//! Pitch tracks and note sequences are stored as JSON so a run can resume
//! from any stage. NaN has no JSON representation and is written as `null`.

use crate::error::Result;
use crate::features::pitch::PitchTrack;
use crate::features::steps::{AnalogNote, NoteSequence};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

fn to_nullable(value: f64) -> Option<f64> {
    (!value.is_nan()).then_some(value)
}

fn from_nullable(value: Option<f64>) -> f64 {
    value.unwrap_or(f64::NAN)
}

/// JSON form of a [`PitchTrack`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchTrackRecord {
    /// Time between samples in seconds
    pub period_s: f64,
    /// Frequency of the 0 semitone
    pub reference_pitch_hz: f64,
    /// Time of the first sample in seconds
    pub offset_s: f64,
    /// Pitch per sample, `null` when undetected
    pub pitch: Vec<Option<f64>>,
    /// Energy per sample, `null` when unavailable
    #[serde(default)]
    pub energy: Vec<Option<f64>>,
}

impl From<&PitchTrack> for PitchTrackRecord {
    fn from(track: &PitchTrack) -> Self {
        Self {
            period_s: track.period_s,
            reference_pitch_hz: track.reference_pitch_hz,
            offset_s: track.offset_s,
            pitch: track.pitch_st.iter().copied().map(to_nullable).collect(),
            energy: track.energy.iter().copied().map(to_nullable).collect(),
        }
    }
}

impl PitchTrackRecord {
    /// Validated track
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the record breaks a [`PitchTrack`] invariant
    pub fn into_track(self) -> Result<PitchTrack> {
        PitchTrack::new(
            self.period_s,
            self.reference_pitch_hz,
            self.offset_s,
            self.pitch.into_iter().map(from_nullable).collect(),
            self.energy.into_iter().map(from_nullable).collect(),
        )
    }
}

/// JSON form of an [`AnalogNote`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    /// False for rests
    pub is_a_note: bool,
    /// Duration in seconds
    pub length_s: f64,
    /// Pitch in semitones, `null` for rests
    pub pitch_st: Option<f64>,
    /// Mean energy, `null` when unavailable
    pub energy: Option<f64>,
    /// Directly follows the previous note
    pub linked: bool,
}

/// JSON form of a [`NoteSequence`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Start time of the first note in seconds
    pub offset_s: f64,
    /// Notes and rests in time order
    pub notes: Vec<NoteRecord>,
}

impl From<&NoteSequence> for StepRecord {
    fn from(sequence: &NoteSequence) -> Self {
        Self {
            offset_s: sequence.offset_s,
            notes: sequence
                .notes
                .iter()
                .map(|n| NoteRecord {
                    is_a_note: n.is_a_note,
                    length_s: n.length_s,
                    pitch_st: to_nullable(n.pitch_st),
                    energy: to_nullable(n.energy),
                    linked: n.linked,
                })
                .collect(),
        }
    }
}

impl From<StepRecord> for NoteSequence {
    fn from(record: StepRecord) -> Self {
        Self {
            offset_s: record.offset_s,
            notes: record
                .notes
                .into_iter()
                .map(|n| AnalogNote {
                    is_a_note: n.is_a_note,
                    length_s: n.length_s,
                    pitch_st: from_nullable(n.pitch_st),
                    energy: from_nullable(n.energy),
                    linked: n.linked,
                })
                .collect(),
        }
    }
}

fn write_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(writer, value)?;
    log::debug!("Wrote {}", path.as_ref().display());
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> Result<T> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    Ok(serde_json::from_reader(reader)?)
}

/// Write a pitch track as JSON
pub fn save_pitch_track<P: AsRef<Path>>(track: &PitchTrack, path: P) -> Result<()> {
    write_json(&PitchTrackRecord::from(track), path)
}

/// Read and validate a pitch track written by [`save_pitch_track`]
pub fn load_pitch_track<P: AsRef<Path>>(path: P) -> Result<PitchTrack> {
    read_json::<PitchTrackRecord, _>(path)?.into_track()
}

/// Write a note sequence as JSON
pub fn save_steps<P: AsRef<Path>>(sequence: &NoteSequence, path: P) -> Result<()> {
    write_json(&StepRecord::from(sequence), path)
}

/// Read a note sequence written by [`save_steps`]
pub fn load_steps<P: AsRef<Path>>(path: P) -> Result<NoteSequence> {
    Ok(read_json::<StepRecord, _>(path)?.into())
}
