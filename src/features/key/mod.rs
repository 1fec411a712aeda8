//! Key estimation and pitch spelling
//!
//! Fits a tuning offset, key signature, clef and mode to the pitches of a
//! note sequence, then spells any pitch as a (step, alteration, octave)
//! triple under that key.

pub mod estimator;
pub mod spelling;

pub use estimator::KeyEstimator;

use serde::{Deserialize, Serialize};

/// Note letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    /// C
    C,
    /// D
    D,
    /// E
    E,
    /// F
    F,
    /// G
    G,
    /// A
    A,
    /// B
    B,
}

impl Step {
    /// Letter name
    pub fn name(&self) -> &'static str {
        match self {
            Step::C => "C",
            Step::D => "D",
            Step::E => "E",
            Step::F => "F",
            Step::G => "G",
            Step::A => "A",
            Step::B => "B",
        }
    }
}

/// Accidental
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alter {
    /// ♭, one semitone down
    Flat,
    /// No alteration
    Natural,
    /// ♯, one semitone up
    Sharp,
}

impl Alter {
    /// Semitone shift
    pub fn semitones(&self) -> i32 {
        match self {
            Alter::Flat => -1,
            Alter::Natural => 0,
            Alter::Sharp => 1,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Alter::Flat => "b",
            Alter::Natural => "",
            Alter::Sharp => "#",
        }
    }
}

/// Clef sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Clef {
    /// Treble clef
    G,
    /// Bass clef
    F,
}

/// Key mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Major
    Major,
    /// Minor
    Minor,
}

/// Spelled pitch in scientific octave numbering (C4 = middle C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotatedPitch {
    /// Letter
    pub step: Step,
    /// Accidental
    pub alter: Alter,
    /// Octave number
    pub octave: i32,
}

impl NotatedPitch {
    /// Name such as `"Eb4"` or `"F#2"`
    pub fn name(&self) -> String {
        format!("{}{}{}", self.step.name(), self.alter.symbol(), self.octave)
    }
}

/// Fitted key of a note sequence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyContext {
    /// Tuning offset in semitones added to every pitch, in `[-0.5, 0.5)`
    pub offset_st: f64,
    /// Key signature: sharps (positive) or flats (negative), -7 to 7
    pub fifths: i8,
    /// Clef
    pub clef: Clef,
    /// Mode
    pub mode: Mode,
}

impl Default for KeyContext {
    fn default() -> Self {
        Self {
            offset_st: 0.0,
            fifths: 0,
            clef: Clef::G,
            mode: Mode::Major,
        }
    }
}

impl KeyContext {
    /// Tonic of the key
    pub fn tonic(&self) -> (Step, Alter) {
        match self.mode {
            Mode::Major => spelling::major_tonic(self.fifths),
            Mode::Minor => spelling::minor_tonic(self.fifths),
        }
    }

    /// Key name such as `"Eb"` or `"F#m"`
    ///
    /// # Example
    ///
    /// ```
    /// use scorelisto::features::key::{KeyContext, Mode};
    ///
    /// let key = KeyContext { fifths: -3, ..KeyContext::default() };
    /// assert_eq!(key.name(), "Eb");
    /// let key = KeyContext { fifths: 3, mode: Mode::Minor, ..KeyContext::default() };
    /// assert_eq!(key.name(), "F#m");
    /// ```
    pub fn name(&self) -> String {
        let (step, alter) = self.tonic();
        let suffix = if self.mode == Mode::Minor { "m" } else { "" };
        format!("{}{}{}", step.name(), alter.symbol(), suffix)
    }
}
