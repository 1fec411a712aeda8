//! Symbolic score assembly
//!
//! Combines the fitted key and the quantized rhythm of a note sequence into
//! an ordered list of notated notes and rests, ready for a document writer.

use crate::config::{RhythmConfig, ScoreConfig};
use crate::error::Result;
use crate::features::key::{Clef, KeyContext, KeyEstimator, Mode, NotatedPitch};
use crate::features::rhythm::{
    NoteRhythm, RhythmEntry, RhythmQuantizer, RhythmResult, Slur, SlurKind, SlurPlacement,
};
use crate::features::steps::NoteSequence;
use crate::progress::Progress;
use serde::{Deserialize, Serialize};

/// Slur number used for linked-note slurs
const SLUR_NUMBER: u8 = 1;

/// One notated note or rest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreNote {
    /// Spelled pitch, `None` for rests
    pub pitch: Option<NotatedPitch>,
    /// Notated rhythm
    pub rhythm: NoteRhythm,
    /// Index of the rendered element in the input sequence, `None` for inserted rests
    pub source: Option<usize>,
}

impl ScoreNote {
    /// True for rests
    pub fn is_rest(&self) -> bool {
        self.pitch.is_none()
    }
}

/// Monophonic score with global key and meter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// Ticks per quarter note
    pub divisions: u32,
    /// Key signature, sharps positive
    pub fifths: i8,
    /// Key mode
    pub mode: Mode,
    /// Clef
    pub clef: Clef,
    /// Beats per measure
    pub beats: u32,
    /// Beat unit
    pub beat_type: u32,
    /// Notes and rests in time order
    pub notes: Vec<ScoreNote>,
}

impl Score {
    /// Notes carrying a pitch
    pub fn pitched_notes(&self) -> impl Iterator<Item = &ScoreNote> {
        self.notes.iter().filter(|n| !n.is_rest())
    }

    /// Total length in ticks
    pub fn total_ticks(&self) -> u32 {
        self.notes.iter().map(|n| n.rhythm.duration).sum()
    }

    /// Save as pretty-printed JSON
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Builds a [`Score`] from a note sequence
///
/// # Example
///
/// ```no_run
/// use scorelisto::analysis::ScoreBuilder;
/// use scorelisto::config::{RhythmConfig, ScoreConfig};
/// use scorelisto::features::steps::{AnalogNote, NoteSequence};
/// use scorelisto::Progress;
///
/// let sequence = NoteSequence {
///     offset_s: 0.0,
///     notes: vec![
///         AnalogNote::note(0.5, 38.0, 0.1, false),
///         AnalogNote::note(0.25, 40.0, 0.1, true),
///         AnalogNote::note(0.25, 42.0, 0.1, true),
///     ],
/// };
/// let mut builder = ScoreBuilder::new(ScoreConfig::default());
/// builder.fit(&sequence)?;
/// let score = builder.perform(&RhythmConfig::default(), &Progress::new())?;
/// println!("{} notes in {}/{}", score.notes.len(), score.beats, score.beat_type);
/// # Ok::<(), scorelisto::TranscriptionError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScoreBuilder {
    config: ScoreConfig,
    key: KeyEstimator,
    quantizer: RhythmQuantizer,
    sequence: NoteSequence,
}

impl ScoreBuilder {
    /// Builder with the given assembly options
    pub fn new(config: ScoreConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Fitted key
    pub fn key(&self) -> &KeyContext {
        self.key.context()
    }

    /// Fit the key and enumerate rhythm configurations
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the sequence has no pitched note, a
    /// non-finite pitch or an invalid length
    pub fn fit(&mut self, sequence: &NoteSequence) -> Result<()> {
        log::debug!("Fitting score builder on {} notes", sequence.notes.len());
        self.key.fit_sequence(sequence)?;
        self.quantizer.fit(sequence)?;
        self.sequence = sequence.clone();
        Ok(())
    }

    /// Quantize the rhythm and assemble the score
    ///
    /// Progress runs to 99 percent in the quantizer and to 100 once the
    /// score is assembled.
    ///
    /// # Errors
    ///
    /// Propagates the quantizer errors (`Infeasible` when no rhythm fits)
    /// and returns `Cancelled` on a cancellation request
    pub fn perform(&self, params: &RhythmConfig, progress: &Progress) -> Result<Score> {
        let rhythm = self.quantizer.perform(params, progress)?;
        progress.report(99.0)?;
        let mut notes = Vec::with_capacity(rhythm.entries.len());
        for entry in &rhythm.entries {
            progress.checkpoint()?;
            notes.push(self.score_note(entry));
        }
        if self.config.slur_linked_notes {
            self.add_slurs(&mut notes);
        }
        progress.set(100.0);
        Ok(self.score(&rhythm, notes))
    }

    fn score_note(&self, entry: &RhythmEntry) -> ScoreNote {
        let pitch = entry
            .source
            .and_then(|s| self.sequence.notes.get(s))
            .filter(|n| entry.is_a_note && n.is_a_note)
            .map(|n| self.key.transform(n.pitch_st));
        ScoreNote {
            pitch,
            rhythm: entry.rhythm.clone(),
            source: entry.source,
        }
    }

    fn score(&self, rhythm: &RhythmResult, notes: Vec<ScoreNote>) -> Score {
        let key = self.key.context();
        log::debug!(
            "Score in {} {}/{}: {} notes and rests",
            key.name(),
            rhythm.beats,
            rhythm.beat_type,
            notes.len()
        );
        Score {
            divisions: rhythm.divisions,
            fifths: key.fifths,
            mode: key.mode,
            clef: key.clef,
            beats: rhythm.beats,
            beat_type: rhythm.beat_type,
            notes,
        }
    }

    /// Slur every run of at least two linked notes
    fn add_slurs(&self, notes: &mut [ScoreNote]) {
        for (first, last) in linked_runs(&self.sequence) {
            let start = notes.iter().position(|n| n.source == Some(first));
            let stop = notes.iter().rposition(|n| n.source == Some(last));
            if let (Some(start), Some(stop)) = (start, stop) {
                mark_slur(&mut notes[start], SlurKind::Start);
                mark_slur(&mut notes[stop], SlurKind::Stop);
            }
        }
    }
}

fn mark_slur(note: &mut ScoreNote, kind: SlurKind) {
    note.rhythm.slurs.insert(
        SLUR_NUMBER,
        Slur {
            placement: SlurPlacement::Above,
            kind,
        },
    );
}

/// First and last indices of each run of pitched notes joined by `linked`
fn linked_runs(sequence: &NoteSequence) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut current: Option<(usize, usize)> = None;
    for (i, note) in sequence.notes.iter().enumerate() {
        current = match current {
            Some((first, _)) if note.is_a_note && note.linked => Some((first, i)),
            _ => {
                if let Some((first, last)) = current.filter(|(f, l)| l > f) {
                    runs.push((first, last));
                }
                note.is_a_note.then_some((i, i))
            }
        };
    }
    if let Some((first, last)) = current.filter(|(f, l)| l > f) {
        runs.push((first, last));
    }
    runs
}
