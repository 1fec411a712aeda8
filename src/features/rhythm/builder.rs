//! Notation of a combination sequence
//!
//! Walks the combinations measure by measure. A combination crossing a
//! barline is clipped into one part per measure and the note cut by the
//! barline is tied across it. Element durations without a single notated
//! value are written as tied canonical values.

use super::catalog::{self, Combination};
use super::{
    BeamOption, Beams, NoteRhythm, NoteType, RhythmEntry, LENGTH_16TH, LENGTH_EIGHTH, LENGTH_HALF,
    LENGTH_QUARTER, LENGTH_T_16TH, LENGTH_T_EIGHTH, LENGTH_WHOLE,
};
use crate::error::{Result, TranscriptionError};

/// A catalog combination and the sequence element of each of its elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedCombination {
    /// Catalog name
    pub name: &'static str,
    /// Source per combination element, `None` for inserted rests
    pub sources: Vec<Option<usize>>,
}

impl PlacedCombination {
    /// Inserted one-beat rest
    pub fn filler_rest() -> Self {
        Self {
            name: catalog::FILLER_REST,
            sources: vec![None],
        }
    }
}

/// Notated value: ticks, head, dotted, triplet
type Value = (u32, NoteType, bool, bool);

const WHOLE: Value = (LENGTH_WHOLE, NoteType::Whole, false, false);
const DOTTED_HALF: Value = (LENGTH_HALF + LENGTH_QUARTER, NoteType::Half, true, false);
const HALF: Value = (LENGTH_HALF, NoteType::Half, false, false);
const DOTTED_QUARTER: Value = (LENGTH_QUARTER + LENGTH_EIGHTH, NoteType::Quarter, true, false);
const QUARTER: Value = (LENGTH_QUARTER, NoteType::Quarter, false, false);
const DOTTED_EIGHTH: Value = (LENGTH_EIGHTH + LENGTH_16TH, NoteType::Eighth, true, false);
const EIGHTH: Value = (LENGTH_EIGHTH, NoteType::Eighth, false, false);
const DOTTED_TRIPLET_EIGHTH: Value = (LENGTH_EIGHTH, NoteType::Eighth, true, true);
const TRIPLET_EIGHTH: Value = (LENGTH_T_EIGHTH, NoteType::Eighth, false, true);
const SIXTEENTH: Value = (LENGTH_16TH, NoteType::Sixteenth, false, false);
const TRIPLET_SIXTEENTH: Value = (LENGTH_T_16TH, NoteType::Sixteenth, false, true);

/// Split a duration into canonical notated values, largest first
///
/// Inside a triplet, an eighth-note duration is written as a dotted triplet
/// eighth.
///
/// # Errors
///
/// Returns `InternalError` when a residual of fewer than 4 ticks remains
pub fn decompose(duration: u32, triplet: bool) -> Result<Vec<NoteRhythm>> {
    let mut values = Vec::new();
    let mut remaining = duration;
    while remaining > 0 {
        let next: &[Value] = match remaining {
            r if r == LENGTH_WHOLE + LENGTH_EIGHTH => &[DOTTED_HALF, DOTTED_QUARTER],
            r if r >= LENGTH_WHOLE => &[WHOLE],
            r if r == LENGTH_HALF + LENGTH_QUARTER + LENGTH_EIGHTH => &[HALF, DOTTED_QUARTER],
            r if r >= LENGTH_HALF + LENGTH_QUARTER => &[DOTTED_HALF],
            r if r == LENGTH_HALF + LENGTH_EIGHTH => &[QUARTER, DOTTED_QUARTER],
            r if r >= LENGTH_HALF => &[HALF],
            r if r >= LENGTH_QUARTER + LENGTH_EIGHTH => &[DOTTED_QUARTER],
            r if r >= LENGTH_QUARTER => &[QUARTER],
            r if r >= LENGTH_EIGHTH + LENGTH_16TH => &[DOTTED_EIGHTH],
            r if r >= LENGTH_EIGHTH && triplet => &[DOTTED_TRIPLET_EIGHTH],
            r if r >= LENGTH_EIGHTH => &[EIGHTH],
            r if r >= LENGTH_T_EIGHTH => &[TRIPLET_EIGHTH],
            r if r >= LENGTH_16TH => &[SIXTEENTH],
            r if r >= LENGTH_T_16TH => &[TRIPLET_SIXTEENTH],
            r => {
                return Err(TranscriptionError::InternalError(format!(
                    "No notated value for {} ticks left of {}",
                    r, duration
                )))
            }
        };
        for &(ticks, note_type, dot, is_triplet) in next {
            values.push(NoteRhythm::new(ticks, note_type, dot, is_triplet));
            remaining -= ticks;
        }
    }
    Ok(values)
}

/// Builder state over one measure size
#[derive(Debug)]
pub struct ScoreRhythmBuilder {
    beats_per_measure: u32,
    beats_done: u32,
    entries: Vec<RhythmEntry>,
}

impl ScoreRhythmBuilder {
    /// Builder for measures of `beats_per_measure` quarter beats
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty measure
    pub fn new(beats_per_measure: u32) -> Result<Self> {
        if beats_per_measure == 0 {
            return Err(TranscriptionError::InvalidInput(
                "Measures must hold at least one beat".to_string(),
            ));
        }
        Ok(Self {
            beats_per_measure,
            beats_done: 0,
            entries: Vec::new(),
        })
    }

    /// Notate `combinations` in order, fill the last measure with quarter
    /// rests and beam sixteenth runs
    ///
    /// # Errors
    ///
    /// Returns `InternalError` for an unknown combination, a source list not
    /// matching its combination, or a duration without notated value
    pub fn build(mut self, combinations: &[PlacedCombination]) -> Result<Vec<RhythmEntry>> {
        log::debug!(
            "Notating {} combinations in {}-beat measures",
            combinations.len(),
            self.beats_per_measure
        );
        for placed in combinations {
            self.add_combination(placed)?;
        }
        self.complete_last_measure();
        self.add_beam_information();
        Ok(self.entries)
    }

    fn beats_remaining_in_measure(&self) -> u32 {
        self.beats_per_measure - self.beats_done % self.beats_per_measure
    }

    fn add_combination(&mut self, placed: &PlacedCombination) -> Result<()> {
        let comb = catalog::get(placed.name)?;
        if placed.sources.len() != comb.nb_notes() {
            return Err(TranscriptionError::InternalError(format!(
                "Combination {} has {} elements but {} sources",
                placed.name,
                comb.nb_notes(),
                placed.sources.len()
            )));
        }
        let mut start_beat = 0;
        while start_beat < comb.nb_beats {
            let stop_beat = start_beat + self.beats_remaining_in_measure().min(comb.nb_beats - start_beat);
            self.add_combination_part(comb, &placed.sources, start_beat, stop_beat)?;
            self.beats_done += stop_beat - start_beat;
            start_beat = stop_beat;
        }
        Ok(())
    }

    /// Notate the elements of `comb` overlapping beats `[start_beat, stop_beat)`
    fn add_combination_part(
        &mut self,
        comb: &Combination,
        sources: &[Option<usize>],
        start_beat: u32,
        stop_beat: u32,
    ) -> Result<()> {
        let window_start = start_beat * LENGTH_QUARTER;
        let window_stop = stop_beat * LENGTH_QUARTER;
        let mut element_start = 0;
        for (k, &duration) in comb.durations.iter().enumerate() {
            let element_stop = element_start + duration;
            let from = element_start.max(window_start);
            let to = element_stop.min(window_stop);
            if from < to {
                let is_a_note = comb.types[k];
                let element = Element {
                    source: sources[k],
                    is_a_note,
                    beams: comb.beams_at(k),
                    triplet: comb.triplet,
                    tie_stop: is_a_note && from > element_start,
                    tie_start: is_a_note && element_stop > to,
                };
                self.add_note(to - from, element)?;
            }
            element_start = element_stop;
        }
        Ok(())
    }

    fn add_note(&mut self, duration: u32, element: Element) -> Result<()> {
        let values = decompose(duration, element.triplet)?;
        let last = values.len().saturating_sub(1);
        for (j, mut rhythm) in values.into_iter().enumerate() {
            rhythm.beams = element.beams.clone();
            rhythm.tie_stop = if j == 0 { element.tie_stop } else { element.is_a_note };
            rhythm.tie_start = if j == last { element.tie_start } else { element.is_a_note };
            self.entries.push(RhythmEntry {
                source: element.source,
                is_a_note: element.is_a_note,
                rhythm,
            });
        }
        Ok(())
    }

    fn complete_last_measure(&mut self) {
        if self.beats_done % self.beats_per_measure == 0 {
            return;
        }
        for _ in 0..self.beats_remaining_in_measure() {
            self.entries.push(RhythmEntry {
                source: None,
                is_a_note: false,
                rhythm: NoteRhythm::new(LENGTH_QUARTER, NoteType::Quarter, false, false),
            });
        }
        self.beats_done += self.beats_remaining_in_measure();
    }

    /// Measure index of the start of every entry
    fn measure_numbers(&self) -> Vec<u32> {
        let measure_ticks = self.beats_per_measure * LENGTH_QUARTER;
        let mut position = 0;
        self.entries
            .iter()
            .map(|entry| {
                let measure = position / measure_ticks;
                position += entry.rhythm.duration;
                measure
            })
            .collect()
    }

    fn is_sixteenth_run(&self, measures: &[u32], start: usize, len: usize) -> bool {
        start + len <= self.entries.len()
            && measures[start + len - 1] == measures[start]
            && self.entries[start..start + len]
                .iter()
                .all(|e| e.is_a_note && e.rhythm.duration == LENGTH_16TH)
    }

    /// Beam runs of four, then three, sixteenth notes within one measure
    ///
    /// Marks already set by the catalog are kept.
    fn add_beam_information(&mut self) {
        const FOUR: [BeamOption; 4] = [BeamOption::Begin, BeamOption::Continue, BeamOption::Continue, BeamOption::End];
        const THREE: [BeamOption; 3] = [BeamOption::Begin, BeamOption::Continue, BeamOption::End];
        let measures = self.measure_numbers();
        let mut i = 0;
        while i < self.entries.len() {
            if self.entries[i].rhythm.duration >= LENGTH_QUARTER {
                i += 1;
                continue;
            }
            let pattern: &[BeamOption] = if self.is_sixteenth_run(&measures, i, 4) {
                &FOUR
            } else if self.is_sixteenth_run(&measures, i, 3) {
                &THREE
            } else {
                i += 1;
                continue;
            };
            for (offset, &option) in pattern.iter().enumerate() {
                let beams: &mut Beams = &mut self.entries[i + offset].rhythm.beams;
                beams.entry(1).or_insert(option);
                beams.entry(2).or_insert(option);
            }
            i += pattern.len();
        }
    }
}

/// Element of a combination part being notated
struct Element {
    source: Option<usize>,
    is_a_note: bool,
    beams: Beams,
    triplet: bool,
    tie_start: bool,
    tie_stop: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placed(name: &'static str, first: usize) -> PlacedCombination {
        let n = catalog::get(name).unwrap().nb_notes();
        PlacedCombination {
            name,
            sources: (first..first + n).map(Some).collect(),
        }
    }

    fn durations(entries: &[RhythmEntry]) -> Vec<u32> {
        entries.iter().map(|e| e.rhythm.duration).collect()
    }

    #[test]
    fn test_decompose_canonical_values() {
        let values = decompose(108, false).unwrap();
        assert_eq!(durations_of(&values), vec![72, 36]);
        assert_eq!(values[0].note_type, NoteType::Half);
        assert!(values[0].dot && values[1].dot);

        assert_eq!(durations_of(&decompose(84, false).unwrap()), vec![48, 36]);
        assert_eq!(decompose(84, false).unwrap()[0].note_type, NoteType::Half);
        assert_eq!(durations_of(&decompose(60, false).unwrap()), vec![24, 36]);
        assert_eq!(durations_of(&decompose(120, false).unwrap()), vec![96, 24]);
        assert_eq!(durations_of(&decompose(30, false).unwrap()), vec![24, 6]);

        let triplet = decompose(12, true).unwrap();
        assert_eq!(triplet, vec![NoteRhythm::new(12, NoteType::Eighth, true, true)]);
        assert_eq!(decompose(4, true).unwrap()[0].note_type, NoteType::Sixteenth);
        assert!(decompose(3, false).is_err());
        assert!(decompose(0, false).unwrap().is_empty());
    }

    fn durations_of(values: &[NoteRhythm]) -> Vec<u32> {
        values.iter().map(|v| v.duration).collect()
    }

    #[test]
    fn test_split_note_is_tied_across_barline() {
        let builder = ScoreRhythmBuilder::new(3).unwrap();
        let entries = builder
            .build(&[placed("1NOTE_2BEATS", 0), placed("1NOTE_2BEATS", 1), placed("1NOTE_2BEATS", 2)])
            .unwrap();
        assert_eq!(durations(&entries), vec![48, 24, 24, 48]);
        assert_eq!(entries[1].source, Some(1));
        assert!(entries[1].rhythm.tie_start && !entries[1].rhythm.tie_stop);
        assert!(entries[2].rhythm.tie_stop && !entries[2].rhythm.tie_start);
        assert_eq!(entries[2].source, Some(1));
        assert!(!entries[0].rhythm.tie_start && !entries[3].rhythm.tie_stop);
    }

    #[test]
    fn test_last_measure_is_filled_with_rests() {
        let entries = ScoreRhythmBuilder::new(4)
            .unwrap()
            .build(&[placed("1NOTE_1BEAT", 0)])
            .unwrap();
        assert_eq!(durations(&entries), vec![24, 24, 24, 24]);
        assert!(entries[1..].iter().all(|e| e.source.is_none() && !e.is_a_note));

        let entries = ScoreRhythmBuilder::new(4)
            .unwrap()
            .build(&[placed("1NOTE_4BEATS", 0)])
            .unwrap();
        assert_eq!(entries.len(), 1, "A full measure needs no filler");
    }

    #[test]
    fn test_split_rest_is_not_tied() {
        let entries = ScoreRhythmBuilder::new(3)
            .unwrap()
            .build(&[placed("1NOTE_2BEATS", 0), placed("1REST_2BEATS", 1)])
            .unwrap();
        assert_eq!(durations(&entries), vec![48, 24, 24, 24, 24]);
        assert!(entries.iter().all(|e| !e.rhythm.tie_start && !e.rhythm.tie_stop));
    }

    #[test]
    fn test_clipped_combination_keeps_values() {
        // DQN_EN from beat 2 of a 3/4 measure: the dotted quarter is cut
        let entries = ScoreRhythmBuilder::new(3)
            .unwrap()
            .build(&[placed("1NOTE_2BEATS", 0), placed("DQN_EN", 1)])
            .unwrap();
        assert_eq!(durations(&entries), vec![48, 24, 12, 12, 24, 24]);
        assert!(entries[1].rhythm.tie_start);
        assert!(entries[2].rhythm.tie_stop);
        assert_eq!(entries[2].rhythm.note_type, NoteType::Eighth);
        assert_eq!(entries[3].source, Some(2));
    }

    #[test]
    fn test_loose_sixteenths_are_beamed() {
        // DEN_SN followed by SN_DEN leaves two adjacent sixteenths only
        let entries = ScoreRhythmBuilder::new(4)
            .unwrap()
            .build(&[placed("DEN_SN", 0), placed("SN_DEN", 2), placed("1NOTE_2BEATS", 4)])
            .unwrap();
        assert!(entries[1].rhythm.beams.is_empty() && entries[2].rhythm.beams.is_empty());

        let entries = ScoreRhythmBuilder::new(4)
            .unwrap()
            .build(&[placed("SN_EN_SN", 0), placed("SN_SN_ER", 3), placed("1NOTE_2BEATS", 6)])
            .unwrap();
        // Catalog beams stay, the level 2 marks are added around them
        let first = &entries[2].rhythm.beams;
        assert_eq!(first.get(&1), Some(&BeamOption::End));
        assert_eq!(first.get(&2), Some(&BeamOption::Begin));
        assert_eq!(entries[4].rhythm.beams.get(&2), Some(&BeamOption::End));
    }

    #[test]
    fn test_mismatched_sources() {
        let bad = PlacedCombination {
            name: "EN_EN",
            sources: vec![Some(0)],
        };
        assert!(ScoreRhythmBuilder::new(4).unwrap().build(&[bad]).is_err());
        assert!(ScoreRhythmBuilder::new(0).is_err());
    }
}
