//! Candidate interpretations of short note runs
//!
//! A [`Configuration`] is a run of consecutive sequence elements (a path)
//! read as one catalog combination over a fixed number of beats. Every
//! structurally matching combination is kept with its fit error, so validity
//! can be decided later against any tempo window.

use super::catalog::{self, MAX_BEATS, MAX_NOTES};
use super::finder::{self, CombinationOptions};
use crate::config::RhythmConfig;
use crate::features::steps::AnalogNote;
use std::collections::BTreeSet;

/// One element of a note path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathElement {
    /// Synthetic rest before the first note, its length is free
    LeadingRest,
    /// Sequence element `i`
    Single(usize),
    /// Note `i` and the rest `i + 1` after it, read as one note
    Fused(usize),
}

impl PathElement {
    /// First sequence index covered, `-1` for the leading rest
    pub fn first_index(&self) -> i64 {
        match self {
            PathElement::LeadingRest => -1,
            PathElement::Single(i) | PathElement::Fused(i) => *i as i64,
        }
    }

    /// Index of the sequence element after this one
    pub fn next_index(&self) -> usize {
        match self {
            PathElement::LeadingRest => 0,
            PathElement::Single(i) => i + 1,
            PathElement::Fused(i) => i + 2,
        }
    }

    /// Sequence element rendered by this path element
    pub fn source(&self) -> Option<usize> {
        match self {
            PathElement::LeadingRest => None,
            PathElement::Single(i) | PathElement::Fused(i) => Some(*i),
        }
    }

    /// Measured length, `None` for the leading rest
    fn length(&self, notes: &[AnalogNote]) -> Option<f64> {
        match *self {
            PathElement::LeadingRest => None,
            PathElement::Single(i) => Some(notes[i].length_s),
            PathElement::Fused(i) => Some(notes[i].length_s + notes[i + 1].length_s),
        }
    }

    fn is_a_note(&self, notes: &[AnalogNote]) -> bool {
        match *self {
            PathElement::LeadingRest => false,
            PathElement::Single(i) => notes[i].is_a_note,
            PathElement::Fused(_) => true,
        }
    }
}

/// Ordered elements of one candidate run
pub type NotePath = Vec<PathElement>;

/// A note path scored against every matching combination of one beat count
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    /// Elements of the run
    pub path: NotePath,
    /// Beats spanned
    pub nb_beats: u32,
    /// Measured element lengths, `None` for the leading rest
    pub lengths: Vec<Option<f64>>,
    /// Fit error per matching combination
    pub options: CombinationOptions,
}

impl Configuration {
    /// First sequence index covered, `-1` when the run opens with the leading rest
    pub fn start_index(&self) -> i64 {
        self.path.first().map_or(0, PathElement::first_index)
    }

    /// Sequence index following the run
    pub fn next_index(&self) -> usize {
        self.path.last().map_or(0, PathElement::next_index)
    }

    /// Element lengths if `name` were played exactly
    pub fn corrected_lengths(&self, name: &str) -> Vec<f64> {
        catalog::get(name)
            .map(|comb| finder::corrected_lengths(comb, &self.lengths))
            .unwrap_or_default()
    }

    /// Implied total length of `name` in seconds
    pub fn total_length(&self, name: &str) -> f64 {
        self.corrected_lengths(name).iter().sum()
    }

    /// Implied beat duration of `name` in seconds
    pub fn delay(&self, name: &str) -> f64 {
        self.total_length(name) / self.nb_beats as f64
    }

    /// Fit error of `name`, infinite when `name` is not an option
    pub fn error(&self, name: &str) -> f64 {
        self.options.get(name).copied().unwrap_or(f64::INFINITY)
    }

    /// Whether one unmasked option fits the error tolerance and the tempo window
    pub fn is_valid(&self, params: &RhythmConfig) -> bool {
        self.options.iter().any(|(&name, &error)| {
            let delay = self.delay(name);
            error < params.error_max
                && !params.masked_combinations.contains(name)
                && delay <= params.delay_max_s
                && delay >= params.delay_min_s
        })
    }

    /// Lowest-error unmasked option, the first by name on ties
    pub fn best_combination(&self, masked: &BTreeSet<String>) -> Option<&'static str> {
        let mut best: Option<(&'static str, f64)> = None;
        for (&name, &error) in &self.options {
            if masked.contains(name) {
                continue;
            }
            if best.map_or(true, |(_, e)| error < e) {
                best = Some((name, error));
            }
        }
        best.map(|(name, _)| name)
    }
}

/// A note followed by a shorter rest can be read as one longer note
fn can_fuse(notes: &[AnalogNote], i: usize) -> bool {
    i + 1 < notes.len()
        && notes[i].is_a_note
        && !notes[i + 1].is_a_note
        && notes[i + 1].length_s < notes[i].length_s
}

fn elements_at(notes: &[AnalogNote], i: usize) -> Vec<PathElement> {
    let mut elements = Vec::with_capacity(2);
    if i < notes.len() {
        elements.push(PathElement::Single(i));
    }
    if can_fuse(notes, i) {
        elements.push(PathElement::Fused(i));
    }
    elements
}

/// Every path of exactly `nb_notes` elements starting at `start`
///
/// `start = None` opens the path with the synthetic leading rest.
pub fn enumerate_paths(notes: &[AnalogNote], start: Option<usize>, nb_notes: usize) -> Vec<NotePath> {
    let mut complete = Vec::new();
    if nb_notes == 0 {
        return complete;
    }
    let mut pending: Vec<NotePath> = match start {
        None => vec![vec![PathElement::LeadingRest]],
        Some(i) => elements_at(notes, i).into_iter().map(|e| vec![e]).collect(),
    };
    while let Some(path) = pending.pop() {
        if path.len() == nb_notes {
            complete.push(path);
            continue;
        }
        let next = path.last().map_or(0, PathElement::next_index);
        for element in elements_at(notes, next) {
            let mut longer = path.clone();
            longer.push(element);
            pending.push(longer);
        }
    }
    // Worklist order is last-in first-out
    complete.reverse();
    complete
}

/// Score every path of 1 to 4 elements over 1 to 8 beats
///
/// Paths opening with the leading rest hold at least one sequence element.
/// Paths without any matching combination are skipped.
pub fn enumerate_configurations(notes: &[AnalogNote]) -> Vec<Configuration> {
    let mut configurations = Vec::new();
    let starts = std::iter::once(None).chain((0..notes.len()).map(Some));
    for start in starts {
        let min_notes = if start.is_none() { 2 } else { 1 };
        for nb_notes in min_notes..=MAX_NOTES {
            for path in enumerate_paths(notes, start, nb_notes) {
                let lengths: Vec<Option<f64>> = path.iter().map(|e| e.length(notes)).collect();
                let types: Vec<bool> = path.iter().map(|e| e.is_a_note(notes)).collect();
                for nb_beats in 1..=MAX_BEATS {
                    let options = finder::find_matches(&lengths, &types, nb_beats);
                    if options.is_empty() {
                        continue;
                    }
                    configurations.push(Configuration {
                        path: path.clone(),
                        nb_beats,
                        lengths: lengths.clone(),
                        options,
                    });
                }
            }
        }
    }
    log::debug!(
        "Enumerated {} rhythm configurations over {} notes",
        configurations.len(),
        notes.len()
    );
    configurations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notes() -> Vec<AnalogNote> {
        vec![
            AnalogNote::note(0.5, 30.0, 0.1, false),
            AnalogNote::note(0.4, 32.0, 0.1, false),
            AnalogNote::rest(0.1),
            AnalogNote::note(0.5, 33.0, 0.1, false),
        ]
    }

    #[test]
    fn test_paths_fuse_note_and_short_rest() {
        use PathElement::*;
        let paths = enumerate_paths(&notes(), Some(1), 2);
        assert_eq!(paths, vec![vec![Single(1), Single(2)], vec![Fused(1), Single(3)]]);
        let paths = enumerate_paths(&notes(), Some(0), 3);
        assert_eq!(
            paths,
            vec![
                vec![Single(0), Single(1), Single(2)],
                vec![Single(0), Fused(1), Single(3)],
            ]
        );
    }

    #[test]
    fn test_paths_running_past_the_end_are_dropped() {
        assert!(enumerate_paths(&notes(), Some(3), 2).is_empty());
        assert_eq!(enumerate_paths(&notes(), Some(3), 1).len(), 1);
        let paths = enumerate_paths(&notes(), None, 2);
        assert_eq!(paths, vec![vec![PathElement::LeadingRest, PathElement::Single(0)]]);
    }

    #[test]
    fn test_long_rest_is_not_fused() {
        let notes = vec![AnalogNote::note(0.2, 30.0, 0.1, false), AnalogNote::rest(0.5)];
        assert_eq!(enumerate_paths(&notes, Some(0), 1).len(), 1);
    }

    #[test]
    fn test_configuration_delay_and_validity() {
        let notes = vec![AnalogNote::note(0.5, 30.0, 0.1, false), AnalogNote::note(0.5, 31.0, 0.1, false)];
        let configurations = enumerate_configurations(&notes);
        let pair = configurations
            .iter()
            .find(|c| c.path.len() == 2 && c.start_index() == 0 && c.nb_beats == 2)
            .unwrap();
        assert!(pair.options.contains_key("DQN_EN"));

        let quarters = configurations
            .iter()
            .find(|c| c.path == vec![PathElement::Single(0)] && c.nb_beats == 1)
            .unwrap();
        assert_eq!(quarters.best_combination(&BTreeSet::new()), Some("1NOTE_1BEAT"));
        assert!((quarters.delay("1NOTE_1BEAT") - 0.5).abs() < 1e-12);
        assert_eq!(quarters.next_index(), 1);

        let mut params = RhythmConfig::default();
        assert!(quarters.is_valid(&params));
        params.masked_combinations.insert("1NOTE_1BEAT".to_string());
        assert!(!quarters.is_valid(&params));
        assert_eq!(quarters.best_combination(&params.masked_combinations), None);
        params.masked_combinations.clear();
        params.delay_min_s = 0.6;
        assert!(!quarters.is_valid(&params));
    }

    #[test]
    fn test_leading_rest_configurations() {
        let notes = vec![AnalogNote::note(0.5, 30.0, 0.1, false)];
        let configurations = enumerate_configurations(&notes);
        let with_rest: Vec<_> = configurations.iter().filter(|c| c.start_index() == -1).collect();
        assert!(!with_rest.is_empty());
        let er_en = with_rest.iter().find(|c| c.options.contains_key("ER_EN")).unwrap();
        assert_eq!(er_en.corrected_lengths("ER_EN"), vec![0.5, 0.5]);
        assert_eq!(er_en.next_index(), 1);
    }
}
