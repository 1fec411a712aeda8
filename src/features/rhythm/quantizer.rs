//! Rhythm quantizer driving configuration search, layout and notation

use super::builder::{PlacedCombination, ScoreRhythmBuilder};
use super::configuration::{enumerate_configurations, Configuration};
use super::graph::{Graph, VertexId};
use super::layout::{choose_layout, BEAT_TYPE};
use super::{catalog, RhythmResult, DIVISIONS};
use crate::config::RhythmConfig;
use crate::error::{Result, TranscriptionError};
use crate::features::steps::NoteSequence;
use crate::progress::Progress;
use std::collections::BTreeMap;

/// Valid configuration with its best combination resolved
#[derive(Debug, Clone)]
struct Candidate<'a> {
    configuration: &'a Configuration,
    best: &'static str,
    delay_s: f64,
    error: f64,
    length_s: f64,
}

/// Quantizes the durations of a note sequence to a notated rhythm
///
/// [`fit`](Self::fit) enumerates and scores every interpretation once;
/// [`perform`](Self::perform) can then be run against any tempo window.
///
/// # Example
///
/// ```no_run
/// use scorelisto::config::RhythmConfig;
/// use scorelisto::features::rhythm::RhythmQuantizer;
/// use scorelisto::features::steps::{AnalogNote, NoteSequence};
/// use scorelisto::Progress;
///
/// let sequence = NoteSequence {
///     offset_s: 0.0,
///     notes: vec![AnalogNote::note(0.5, 30.0, 0.1, false); 4],
/// };
/// let mut quantizer = RhythmQuantizer::new();
/// quantizer.fit(&sequence)?;
/// let rhythm = quantizer.perform(&RhythmConfig::default(), &Progress::new())?;
/// println!("{}/{} in {} measures", rhythm.beats, rhythm.beat_type, rhythm.measure_count());
/// # Ok::<(), scorelisto::TranscriptionError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct RhythmQuantizer {
    note_count: usize,
    configurations: Vec<Configuration>,
}

impl RhythmQuantizer {
    /// Quantizer without any fitted sequence
    pub fn new() -> Self {
        Self::default()
    }

    /// Scored configurations of the fitted sequence
    pub fn configurations(&self) -> &[Configuration] {
        &self.configurations
    }

    /// Enumerate and score the configurations of `sequence`
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a note length is not positive and finite
    pub fn fit(&mut self, sequence: &NoteSequence) -> Result<()> {
        log::debug!("Fitting rhythm quantizer on {} notes", sequence.notes.len());
        if let Some((i, note)) = sequence
            .notes
            .iter()
            .enumerate()
            .find(|(_, n)| !(n.length_s > 0.0) || !n.length_s.is_finite())
        {
            return Err(TranscriptionError::InvalidInput(format!(
                "Note {} has invalid length {}",
                i, note.length_s
            )));
        }
        self.note_count = sequence.notes.len();
        self.configurations = enumerate_configurations(&sequence.notes);
        Ok(())
    }

    /// Quantize the fitted sequence
    ///
    /// Progress goes from 0 to 99 percent.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for an invalid `params`
    /// - `Cancelled` when `progress` is cancelled
    /// - `Infeasible` when no interpretation covers the whole sequence
    /// - `InternalError` if notation reaches an unknown duration
    pub fn perform(&self, params: &RhythmConfig, progress: &Progress) -> Result<RhythmResult> {
        log::debug!(
            "Quantizing rhythm: beat in [{}, {}] s, error < {}, {} masked combinations",
            params.delay_min_s,
            params.delay_max_s,
            params.error_max,
            params.masked_combinations.len()
        );
        progress.report(0.0)?;
        params.validate()?;
        for name in &params.masked_combinations {
            if catalog::get(name).is_err() {
                log::warn!("Masked combination {} is not in the catalog", name);
            }
        }

        let candidates = self.valid_candidates(params)?;
        if candidates.is_empty() {
            return Err(TranscriptionError::Infeasible(
                "No feasible rhythm: no configuration fits the tempo window".to_string(),
            ));
        }
        let (graph, start, end) = self.build_graph(&candidates, params, progress)?;
        progress.report(20.0)?;

        let path = graph.shortest_path(start, end);
        if path.is_empty() {
            return Err(TranscriptionError::Infeasible(
                "No feasible rhythm: no path covers the whole sequence".to_string(),
            ));
        }
        progress.report(40.0)?;

        // Vertex v >= 2 is candidate v - 2
        let chosen: Vec<&Candidate> = path
            .iter()
            .filter(|&&v| v != end)
            .filter_map(|&v| candidates.get(v - 2))
            .collect();
        let beats: Vec<u32> = chosen.iter().map(|c| c.configuration.nb_beats).collect();
        let layout = choose_layout(&beats);

        let mut placed: Vec<PlacedCombination> = (0..layout.leading_rests)
            .map(|_| PlacedCombination::filler_rest())
            .collect();
        placed.extend(chosen.iter().map(|c| PlacedCombination {
            name: c.best,
            sources: c.configuration.path.iter().map(|e| e.source()).collect(),
        }));
        progress.report(60.0)?;

        let entries = ScoreRhythmBuilder::new(layout.beats_per_measure)?.build(&placed)?;
        progress.report(99.0)?;
        log::debug!(
            "Rhythm path of {} combinations, {}/{} with {} leading rests",
            chosen.len(),
            layout.beats_per_measure,
            BEAT_TYPE,
            layout.leading_rests
        );

        Ok(RhythmResult {
            divisions: DIVISIONS,
            beats: layout.beats_per_measure,
            beat_type: BEAT_TYPE,
            leading_rests: layout.leading_rests,
            combinations: placed.iter().map(|p| p.name.to_string()).collect(),
            entries,
        })
    }

    fn valid_candidates(&self, params: &RhythmConfig) -> Result<Vec<Candidate<'_>>> {
        let mut candidates = Vec::new();
        for configuration in self.configurations.iter().filter(|c| c.is_valid(params)) {
            let best = configuration
                .best_combination(&params.masked_combinations)
                .ok_or_else(|| {
                    TranscriptionError::InternalError(
                        "Valid configuration without best combination".to_string(),
                    )
                })?;
            candidates.push(Candidate {
                configuration,
                best,
                delay_s: configuration.delay(best),
                error: configuration.error(best),
                length_s: configuration.total_length(best),
            });
        }
        log::debug!(
            "{} of {} configurations are valid",
            candidates.len(),
            self.configurations.len()
        );
        Ok(candidates)
    }

    /// START and END are vertices 0 and 1, candidate `k` is vertex `k + 2`
    fn build_graph(
        &self,
        candidates: &[Candidate],
        params: &RhythmConfig,
        progress: &Progress,
    ) -> Result<(Graph, VertexId, VertexId)> {
        let mut graph = Graph::new();
        let start = graph.add_vertex();
        let end = graph.add_vertex();
        let mut by_start: BTreeMap<i64, Vec<VertexId>> = BTreeMap::new();
        for candidate in candidates {
            let vertex = graph.add_vertex();
            by_start
                .entry(candidate.configuration.start_index())
                .or_default()
                .push(vertex);
        }
        let candidate_at = |v: VertexId| &candidates[v - 2];

        // A leading rest is rewarded by its length
        for &v in by_start.get(&-1).into_iter().flatten() {
            let candidate = candidate_at(v);
            let rest_s = candidate
                .configuration
                .corrected_lengths(candidate.best)
                .first()
                .copied()
                .unwrap_or(0.0);
            graph.add_edge(start, v, -rest_s)?;
        }
        for &v in by_start.get(&0).into_iter().flatten() {
            graph.add_edge(start, v, 0.0)?;
        }

        for (k, current) in candidates.iter().enumerate() {
            progress.checkpoint()?;
            let vertex = k + 2;
            let next_index = current.configuration.next_index();
            if next_index >= self.note_count {
                graph.add_edge(vertex, end, current.length_s)?;
                continue;
            }
            for &v in by_start.get(&(next_index as i64)).into_iter().flatten() {
                let next = candidate_at(v);
                if (current.delay_s - next.delay_s).abs() / current.delay_s > params.max_delay_var {
                    continue;
                }
                let weight = (1.0 - params.delay_weight)
                    * delay_consistency(current.delay_s, next.delay_s, current.length_s)
                    + params.delay_weight * current.error;
                graph.add_edge(vertex, v, weight)?;
            }
        }
        log::debug!(
            "Rhythm graph: {} vertices, {} edges",
            graph.vertex_count(),
            graph.edge_count()
        );
        Ok((graph, start, end))
    }
}

/// Transition cost between beat durations, in decibel-like units
fn delay_consistency(current_delay_s: f64, next_delay_s: f64, length_s: f64) -> f64 {
    let change = 10.0 * next_delay_s.log10() - 10.0 * current_delay_s.log10();
    (change * change + length_s * length_s).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::rhythm::{
        BeamOption, Beams, NoteRhythm, NoteType, LENGTH_16TH, LENGTH_EIGHTH, LENGTH_HALF,
        LENGTH_QUARTER, LENGTH_T_16TH, LENGTH_T_EIGHTH,
    };
    use crate::features::steps::AnalogNote;

    fn sequence(lengths: &[f64]) -> NoteSequence {
        NoteSequence {
            offset_s: 0.0,
            notes: lengths.iter().map(|&l| AnalogNote::note(l, 9.0, 0.5, false)).collect(),
        }
    }

    fn rhythm(duration: u32, note_type: NoteType, dot: bool, triplet: bool, beams: &[(u8, BeamOption)]) -> NoteRhythm {
        let mut value = NoteRhythm::new(duration, note_type, dot, triplet);
        value.beams = beams.iter().copied().collect::<Beams>();
        value
    }

    #[test]
    fn test_empty_sequence_is_infeasible() {
        let mut quantizer = RhythmQuantizer::new();
        quantizer.fit(&sequence(&[])).unwrap();
        let result = quantizer.perform(&RhythmConfig::default(), &Progress::new());
        assert!(matches!(result, Err(TranscriptionError::Infeasible(_))), "Got {:?}", result);
    }

    #[test]
    fn test_invalid_lengths_are_rejected() {
        let mut quantizer = RhythmQuantizer::new();
        assert!(quantizer.fit(&sequence(&[0.5, f64::NAN])).is_err());
        assert!(quantizer.fit(&sequence(&[0.5, 0.0])).is_err());
    }

    #[test]
    fn test_tempo_window_out_of_reach() {
        let mut quantizer = RhythmQuantizer::new();
        quantizer.fit(&sequence(&[0.5, 0.25, 0.25])).unwrap();
        let params = RhythmConfig {
            delay_min_s: 5.0,
            delay_max_s: 6.0,
            ..RhythmConfig::default()
        };
        let result = quantizer.perform(&params, &Progress::new());
        assert!(matches!(result, Err(TranscriptionError::Infeasible(_))));
    }

    #[test]
    fn test_cancelled_before_start() {
        let mut quantizer = RhythmQuantizer::new();
        quantizer.fit(&sequence(&[0.5, 0.25, 0.25])).unwrap();
        let progress = Progress::new();
        progress.cancel();
        let result = quantizer.perform(&RhythmConfig::default(), &progress);
        assert_eq!(result, Err(TranscriptionError::Cancelled));
    }

    #[test]
    fn test_reproduces_canonical_patterns() {
        let ql = 60.0 / 95.0;
        let lengths = [
            ql, // 1NOTE_1BEAT
            ql / 2.0, ql / 2.0, // EN_EN
            ql / 3.0, ql / 3.0, ql / 3.0, // T_EN_EN_EN
            ql * 2.0, // 1NOTE_2BEATS
            ql, // 1NOTE_1BEAT
            ql * 1.5, ql / 2.0, // DQN_EN
            ql / 4.0, ql / 4.0, ql / 4.0, ql / 4.0, // SN_SN_SN_SN
            ql / 2.0, ql / 4.0, ql / 4.0, // EN_SN_SN
            ql / 4.0, ql / 4.0, ql / 2.0, // SN_SN_EN
            ql / 6.0, ql / 3.0, ql / 2.0, // T_SN_EN_DEN
            ql * 6.0, // 1NOTE_6BEATS
        ];
        let mut quantizer = RhythmQuantizer::new();
        quantizer.fit(&sequence(&lengths)).unwrap();
        let progress = Progress::new();
        let result = quantizer.perform(&RhythmConfig::default(), &progress).unwrap();
        assert_eq!(progress.value(), 99.0);
        assert_eq!((result.beats, result.beat_type, result.leading_rests), (3, 4, 0));

        use BeamOption::{Begin as B, Continue as C, End as E};
        use NoteType::*;
        let mut tied_start = rhythm(LENGTH_HALF + LENGTH_QUARTER, Half, true, false, &[]);
        tied_start.tie_start = true;
        let mut tied_stop = rhythm(LENGTH_HALF + LENGTH_QUARTER, Half, true, false, &[]);
        tied_stop.tie_stop = true;
        let expected = vec![
            rhythm(LENGTH_QUARTER, Quarter, false, false, &[]),
            rhythm(LENGTH_EIGHTH, Eighth, false, false, &[(1, B)]),
            rhythm(LENGTH_EIGHTH, Eighth, false, false, &[(1, E)]),
            rhythm(LENGTH_T_EIGHTH, Eighth, false, true, &[(1, B)]),
            rhythm(LENGTH_T_EIGHTH, Eighth, false, true, &[(1, C)]),
            rhythm(LENGTH_T_EIGHTH, Eighth, false, true, &[(1, E)]),
            rhythm(LENGTH_HALF, Half, false, false, &[]),
            rhythm(LENGTH_QUARTER, Quarter, false, false, &[]),
            rhythm(LENGTH_QUARTER + LENGTH_EIGHTH, Quarter, true, false, &[]),
            rhythm(LENGTH_EIGHTH, Eighth, false, false, &[]),
            rhythm(LENGTH_16TH, Sixteenth, false, false, &[(1, B), (2, B)]),
            rhythm(LENGTH_16TH, Sixteenth, false, false, &[(1, C), (2, C)]),
            rhythm(LENGTH_16TH, Sixteenth, false, false, &[(1, C), (2, C)]),
            rhythm(LENGTH_16TH, Sixteenth, false, false, &[(1, E), (2, E)]),
            rhythm(LENGTH_EIGHTH, Eighth, false, false, &[(1, B)]),
            rhythm(LENGTH_16TH, Sixteenth, false, false, &[(1, C), (2, B)]),
            rhythm(LENGTH_16TH, Sixteenth, false, false, &[(1, E), (2, E)]),
            rhythm(LENGTH_16TH, Sixteenth, false, false, &[(1, B), (2, B)]),
            rhythm(LENGTH_16TH, Sixteenth, false, false, &[(1, C), (2, E)]),
            rhythm(LENGTH_EIGHTH, Eighth, false, false, &[(1, E)]),
            rhythm(LENGTH_T_16TH, Sixteenth, false, true, &[(1, B)]),
            rhythm(LENGTH_T_EIGHTH, Eighth, false, true, &[(1, C)]),
            rhythm(LENGTH_T_EIGHTH + LENGTH_T_16TH, Eighth, true, true, &[(1, E)]),
            tied_start,
            tied_stop,
        ];
        assert_eq!(result.entries.len(), expected.len());
        for (k, (entry, want)) in result.entries.iter().zip(&expected).enumerate() {
            assert_eq!(&entry.rhythm, want, "Entry {}", k);
            let source = if k < 23 { k } else { 23 };
            assert_eq!(entry.source, Some(source), "Source of entry {}", k);
            assert!(entry.is_a_note);
        }
        assert_eq!(result.measure_count(), 6);
    }

    #[test]
    fn test_masked_combination_is_avoided() {
        let mut quantizer = RhythmQuantizer::new();
        quantizer.fit(&sequence(&[1.0])).unwrap();
        let mut params = RhythmConfig::default();
        params.masked_combinations.insert("1NOTE_1BEAT".to_string());
        let result = quantizer.perform(&params, &Progress::new()).unwrap();
        assert!(result.combinations.iter().all(|c| c != "1NOTE_1BEAT"));
        assert!(result.combinations.iter().any(|c| c.starts_with("1NOTE_")));
    }

    #[test]
    fn test_fully_masked_catalog_is_infeasible() {
        let mut quantizer = RhythmQuantizer::new();
        quantizer.fit(&sequence(&[1.0])).unwrap();
        let mut params = RhythmConfig::default();
        params.masked_combinations = catalog::catalog().keys().map(|name| name.to_string()).collect();
        let result = quantizer.perform(&params, &Progress::new());
        assert!(matches!(result, Err(TranscriptionError::Infeasible(_))), "Got {:?}", result);
    }
}
