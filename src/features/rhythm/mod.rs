//! Rhythm quantization
//!
//! Turns the free durations of a [`NoteSequence`](crate::features::steps::NoteSequence)
//! into notated values on a beat grid.
//!
//! # Algorithm
//!
//! 1. Enumerate configurations: runs of 1 to 4 consecutive notes (optionally
//!    preceded by a synthetic leading rest) matched against every catalog
//!    combination spanning 1 to 8 beats
//! 2. Keep the configurations fitting the tempo window and error tolerance
//! 3. Link configurations covering adjacent note ranges into a graph weighted
//!    by tempo consistency and fit error, then find the shortest START to END path
//! 4. Choose the measure size and leading filler rests that split the fewest
//!    combinations across barlines
//! 5. Notate the combination sequence measure by measure, with ties across
//!    barlines and beams over sixteenth runs
//!
//! Durations are expressed in ticks of [`DIVISIONS`] per quarter note.

pub mod builder;
pub mod catalog;
pub mod configuration;
pub mod finder;
pub mod graph;
pub mod layout;
pub mod quantizer;

pub use quantizer::RhythmQuantizer;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ticks per quarter note
pub const DIVISIONS: u32 = 24;
/// Whole note in ticks
pub const LENGTH_WHOLE: u32 = DIVISIONS * 4;
/// Half note in ticks
pub const LENGTH_HALF: u32 = DIVISIONS * 2;
/// Quarter note in ticks
pub const LENGTH_QUARTER: u32 = DIVISIONS;
/// Eighth note in ticks
pub const LENGTH_EIGHTH: u32 = DIVISIONS / 2;
/// Sixteenth note in ticks
pub const LENGTH_16TH: u32 = DIVISIONS / 4;
/// Triplet eighth note in ticks
pub const LENGTH_T_EIGHTH: u32 = DIVISIONS / 3;
/// Triplet sixteenth note in ticks
pub const LENGTH_T_16TH: u32 = DIVISIONS / 6;

/// Notated value of a note head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteType {
    /// Sixteenth
    Sixteenth,
    /// Eighth
    Eighth,
    /// Quarter
    Quarter,
    /// Half
    Half,
    /// Whole
    Whole,
}

/// Position of a note inside a beam
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeamOption {
    /// First note of the beam
    Begin,
    /// Inner note
    Continue,
    /// Last note of the beam
    End,
}

/// Beam state per beam level (1 = eighth beam, 2 = sixteenth beam)
pub type Beams = BTreeMap<u8, BeamOption>;

/// Side of the staff a slur is drawn on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlurPlacement {
    /// Under the notes
    Below,
    /// Over the notes
    Above,
}

/// Position of a note inside a slur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlurKind {
    /// First note
    Start,
    /// Inner note
    Continue,
    /// Last note
    Stop,
}

/// Slur mark on one note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slur {
    /// Side of the staff
    pub placement: SlurPlacement,
    /// Position in the slur
    pub kind: SlurKind,
}

/// Slur marks per slur number
pub type Slurs = BTreeMap<u8, Slur>;

/// Notated rhythm of one note or rest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRhythm {
    /// Duration in ticks
    pub duration: u32,
    /// Head value
    pub note_type: NoteType,
    /// Dotted value
    pub dot: bool,
    /// Member of a triplet
    pub triplet: bool,
    /// Beam marks
    pub beams: Beams,
    /// Slur marks
    pub slurs: Slurs,
    /// Tied to the next note
    pub tie_start: bool,
    /// Tied from the previous note
    pub tie_stop: bool,
}

impl NoteRhythm {
    /// Plain value without beams, slurs or ties
    pub fn new(duration: u32, note_type: NoteType, dot: bool, triplet: bool) -> Self {
        Self {
            duration,
            note_type,
            dot,
            triplet,
            beams: Beams::new(),
            slurs: Slurs::new(),
            tie_start: false,
            tie_stop: false,
        }
    }
}

/// One notated value and the note of the sequence it renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhythmEntry {
    /// Index in the input sequence, `None` for inserted rests
    pub source: Option<usize>,
    /// `false` for rests
    pub is_a_note: bool,
    /// Notated rhythm
    pub rhythm: NoteRhythm,
}

/// Quantized rhythm of a sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhythmResult {
    /// Ticks per quarter note
    pub divisions: u32,
    /// Beats per measure
    pub beats: u32,
    /// Beat unit (4 = quarter)
    pub beat_type: u32,
    /// Quarter rests inserted before the first combination
    pub leading_rests: u32,
    /// Combination names along the chosen path, filler rests included
    pub combinations: Vec<String>,
    /// Notated values in time order
    pub entries: Vec<RhythmEntry>,
}

impl RhythmResult {
    /// Total notated length in ticks
    pub fn total_ticks(&self) -> u32 {
        self.entries.iter().map(|e| e.rhythm.duration).sum()
    }

    /// Number of measures
    pub fn measure_count(&self) -> u32 {
        let measure = self.beats * self.divisions;
        if measure == 0 {
            0
        } else {
            self.total_ticks().div_ceil(measure)
        }
    }
}
