//! Histogram-based step recovery
//!
//! Finds the dominant pitch levels of a voiced group and snaps every sample
//! to one of them.
//!
//! # Algorithm
//!
//! 1. Histogram of the pitch with `bin_width_st` bins, aligned on multiples of the bin width
//! 2. Smoothing by a Gaussian whose full width at half maximum is `mid_height_width_st`
//! 3. Every local maximum is a candidate level; its smoothed count times the
//!    period estimates how long the level is held
//! 4. Candidates shorter than `min_note_length_s` are dropped (at least one is kept)
//! 5. While the two closest levels are less than `min_note_gap_st` apart, the
//!    shorter one is dropped
//! 6. Each sample takes its nearest level, then runs shorter than the minimum
//!    length are absorbed by a sliding mode filter until nothing changes

use super::{SegmentationStrategy, StepRun};
use crate::config::{HistogramConfig, StepConfig};
use crate::error::{Result, TranscriptionError};
use crate::signal::density::{histogram, Histogram};
use crate::signal::extrema::{local_extrema, most_common};
use crate::signal::filter::{convolve_same, gaussian};
use std::cmp::Ordering;

/// FWHM to standard deviation ratio of a Gaussian
const FWHM_PER_STD: f64 = 2.355;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Level {
    length_s: f64,
    value_st: f64,
}

/// Step recovery from the smoothed pitch histogram
#[derive(Debug, Clone)]
pub struct HistogramSegmentation {
    bin_width_st: f64,
    kernel: Vec<f64>,
}

impl Default for HistogramSegmentation {
    fn default() -> Self {
        let config = HistogramConfig::default();
        Self::with_widths(config.bin_width_st, config.mid_height_width_st)
    }
}

fn smoothing_kernel(std_bins: f64) -> Vec<f64> {
    let mut nb_samples = (std_bins * 6.0).ceil() as usize;
    if nb_samples % 2 == 0 {
        nb_samples += 1;
    }
    // Only fails for an even length or a non-positive deviation, both excluded
    gaussian(nb_samples, std_bins).unwrap_or_else(|_| vec![1.0])
}

impl HistogramSegmentation {
    /// Strategy with the given histogram resolution and smoothing
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a width is not positive
    pub fn new(config: &HistogramConfig) -> Result<Self> {
        if !(config.bin_width_st > 0.0) || !(config.mid_height_width_st > 0.0) {
            return Err(TranscriptionError::InvalidInput(format!(
                "Histogram widths must be positive, got bin {} st and smoothing {} st",
                config.bin_width_st, config.mid_height_width_st
            )));
        }
        Ok(Self::with_widths(config.bin_width_st, config.mid_height_width_st))
    }

    fn with_widths(bin_width_st: f64, mid_height_width_st: f64) -> Self {
        let std_bins = (mid_height_width_st / bin_width_st) / FWHM_PER_STD;
        Self {
            bin_width_st,
            kernel: smoothing_kernel(std_bins),
        }
    }

    fn pitch_histogram(&self, pitch: &[f64]) -> Result<Histogram> {
        let finite: Vec<f64> = pitch.iter().copied().filter(|p| p.is_finite()).collect();
        if finite.is_empty() {
            return Err(TranscriptionError::InvalidInput(
                "Pitch group holds no finite value".to_string(),
            ));
        }
        let (min, max) = finite
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let mut nb_min = (min / self.bin_width_st).floor() as i64;
        let mut nb_max = (max / self.bin_width_st).ceil() as i64;
        if nb_min == nb_max {
            nb_min -= 1;
            nb_max += 1;
        }
        let mut histo = histogram(
            &finite,
            (nb_max - nb_min) as usize,
            nb_min as f64 * self.bin_width_st,
            nb_max as f64 * self.bin_width_st,
        )?;
        histo.data = convolve_same(&histo.data, &self.kernel);
        Ok(histo)
    }

    /// Local maxima of the smoothed histogram as pitch levels
    ///
    /// A histogram without any maximum (a single bin, or a flat one) yields
    /// one level at its highest bin.
    fn candidate_levels(&self, histo: &Histogram, period_s: f64) -> Result<Vec<Level>> {
        let mut maxima = if histo.data.len() < 2 {
            Vec::new()
        } else {
            local_extrema(&histo.data, true, true)?
        };
        if maxima.is_empty() {
            let argmax = (0..histo.data.len())
                .max_by(|&a, &b| histo.data[a].partial_cmp(&histo.data[b]).unwrap_or(Ordering::Equal))
                .unwrap_or(0);
            maxima.push(argmax);
        }
        Ok(maxima
            .into_iter()
            .map(|i| Level {
                length_s: histo.data[i] * period_s,
                value_st: histo.x[i] + self.bin_width_st / 2.0,
            })
            .collect())
    }
}

fn delete_too_short(levels: &mut Vec<Level>, min_length_s: f64) {
    levels.sort_by(|a, b| a.length_s.partial_cmp(&b.length_s).unwrap_or(Ordering::Equal));
    let too_short = levels
        .iter()
        .take(levels.len().saturating_sub(1))
        .take_while(|l| l.length_s < min_length_s)
        .count();
    levels.drain(..too_short);
}

/// Drop the shorter of the two closest levels until every gap reaches `min_gap_st`
///
/// The longer level is kept as it is. On equal lengths the lower one stays.
fn delete_too_close(levels: &mut Vec<Level>, min_gap_st: f64) {
    levels.sort_by(|a, b| a.value_st.partial_cmp(&b.value_st).unwrap_or(Ordering::Equal));
    loop {
        let closest = (1..levels.len()).min_by(|&a, &b| {
            let gap_a = levels[a].value_st - levels[a - 1].value_st;
            let gap_b = levels[b].value_st - levels[b - 1].value_st;
            gap_a.partial_cmp(&gap_b).unwrap_or(Ordering::Equal)
        });
        let Some(upper) = closest else { break };
        let (low, high) = (levels[upper - 1], levels[upper]);
        if !(high.value_st - low.value_st < min_gap_st) {
            break;
        }
        let removed = if high.length_s > low.length_s { upper - 1 } else { upper };
        levels.remove(removed);
    }
}

fn best_fit(levels: &[Level], pitch: &[f64]) -> Vec<usize> {
    pitch
        .iter()
        .map(|&p| {
            let mut best = 0;
            let mut distance = f64::MAX;
            for (k, level) in levels.iter().enumerate() {
                let d = (level.value_st - p).abs();
                if d < distance {
                    best = k;
                    distance = d;
                }
            }
            best
        })
        .collect()
}

/// Sliding mode filter over `2 * half_window + 1` samples, repeated to a fixed point
fn clear_fitted(fitted: &mut [usize], half_window: usize) -> Result<()> {
    let n = fitted.len();
    let window = 2 * half_window + 1;
    if n <= window {
        let mode = most_common(fitted)?;
        fitted.fill(mode);
        return Ok(());
    }

    // Alternating patterns never settle, stop after one pass per sample
    for _ in 0..n {
        let previous = fitted.to_vec();
        let head = most_common(&previous[..window])?;
        fitted[..half_window].fill(head);
        for k in half_window..n - half_window - 1 {
            fitted[k] = most_common(&previous[k - half_window..=k + half_window])?;
        }
        let tail = most_common(&previous[n - window..])?;
        fitted[n - half_window - 1..].fill(tail);
        if *fitted == previous[..] {
            return Ok(());
        }
    }
    log::warn!("Step cleaning did not converge over {} samples", n);
    Ok(())
}

impl SegmentationStrategy for HistogramSegmentation {
    fn recover_steps(&self, pitch: &[f64], period_s: f64, params: &StepConfig) -> Result<Vec<StepRun>> {
        if !(period_s > 0.0) {
            return Err(TranscriptionError::InvalidInput(format!(
                "Sampling period must be positive, got {}",
                period_s
            )));
        }
        let histo = self.pitch_histogram(pitch)?;
        let mut levels = self.candidate_levels(&histo, period_s)?;
        delete_too_short(&mut levels, params.min_note_length_s);
        delete_too_close(&mut levels, params.min_note_gap_st);
        log::debug!(
            "{} pitch levels kept for a group of {} samples",
            levels.len(),
            pitch.len()
        );

        let mut fitted = best_fit(&levels, pitch);
        let half_window = (params.min_note_length_s / period_s).round() as usize;
        clear_fitted(&mut fitted, half_window)?;

        let mut runs: Vec<StepRun> = Vec::new();
        for &index in &fitted {
            match runs.last_mut() {
                Some(run) if run.pitch_st == levels[index].value_st => run.count += 1,
                _ => runs.push(StepRun {
                    count: 1,
                    pitch_st: levels[index].value_st,
                }),
            }
        }
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::pitch::PitchTrack;
    use crate::features::steps::{AnalogNote, NoteSequence, StepSegmenter};
    use crate::progress::Progress;

    const NAN: f64 = f64::NAN;

    fn params(median_filter_width_s: f64) -> StepConfig {
        StepConfig {
            min_note_length_s: 0.05,
            min_note_gap_st: 2.0 / 3.0,
            median_filter_width_s,
            min_pitch_st: 0.0,
            max_pitch_st: 200.0,
        }
    }

    fn segment(pitch: Vec<f64>, energy: Vec<f64>, mask: Option<Vec<bool>>, median_s: f64) -> NoteSequence {
        let track = PitchTrack::new(0.01, 32.7032, 0.0, pitch, energy).unwrap();
        let strategy = Box::new(HistogramSegmentation::default());
        let mut segmenter = match mask {
            Some(mask) => StepSegmenter::with_mask(&track, strategy, mask).unwrap(),
            None => StepSegmenter::new(&track, strategy).unwrap(),
        };
        segmenter.perform(&params(median_s), &Progress::new()).unwrap()
    }

    fn assert_note(note: &AnalogNote, length_s: f64, pitch_st: f64, linked: bool) {
        assert!(note.is_a_note, "Expected a note, got {:?}", note);
        assert!((note.length_s - length_s).abs() < 1e-9, "Expected {} s, got {}", length_s, note.length_s);
        assert!((note.pitch_st - pitch_st).abs() < 0.01, "Expected {} st, got {}", pitch_st, note.pitch_st);
        assert_eq!(note.linked, linked);
    }

    fn repeat(value: f64, count: usize) -> Vec<f64> {
        vec![value; count]
    }

    #[test]
    fn test_one_note() {
        let result = segment(repeat(4.0, 8), vec![], None, 0.02);
        assert_eq!(result.offset_s, 0.0);
        assert_eq!(result.notes.len(), 1);
        assert_note(&result.notes[0], 0.08, 4.0, false);
        assert!(result.notes[0].energy.is_nan());
    }

    #[test]
    fn test_two_notes() {
        let pitch = [repeat(3.0, 10), repeat(5.0, 10)].concat();
        let result = segment(pitch, vec![], None, 0.02);
        assert_eq!(result.notes.len(), 2);
        assert_note(&result.notes[0], 0.1, 3.0, false);
        assert_note(&result.notes[1], 0.1, 5.0, true);
    }

    #[test]
    fn test_mean_energy_per_note() {
        let pitch = [repeat(3.0, 10), repeat(5.0, 10)].concat();
        let energy = [repeat(0.2, 10), repeat(0.4, 10)].concat();
        let track = PitchTrack::new(0.01, 32.7032, 0.0, pitch, energy).unwrap();
        let mut segmenter = StepSegmenter::new(&track, Box::new(HistogramSegmentation::default())).unwrap();
        segmenter.detect_groups(0.05).unwrap();
        let result = segmenter.extract_notes(&params(0.02), &Progress::new()).unwrap();
        assert!((result.notes[0].energy - 0.2).abs() < 1e-12);
        assert!((result.notes[1].energy - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_one_short_nan_is_filtered_out() {
        let pitch = [repeat(3.0, 10), vec![NAN], repeat(5.0, 10)].concat();
        let result = segment(pitch, vec![], None, 0.02);
        assert_eq!(result.notes.len(), 2);
        assert_note(&result.notes[0], 0.11, 3.0, false);
        assert_note(&result.notes[1], 0.1, 5.0, true);
    }

    #[test]
    fn test_one_long_nan_becomes_a_rest() {
        let pitch = [repeat(3.0, 10), vec![NAN, NAN], repeat(5.0, 10)].concat();
        let result = segment(pitch, vec![], None, 0.03);
        assert_eq!(result.notes.len(), 3);
        assert_note(&result.notes[0], 0.1, 3.0, false);
        let rest = &result.notes[1];
        assert!(!rest.is_a_note && !rest.linked);
        assert!((rest.length_s - 0.02).abs() < 1e-9);
        assert!(rest.pitch_st.is_nan() && rest.energy.is_nan());
        assert_note(&result.notes[2], 0.1, 5.0, false);
    }

    #[test]
    fn test_note_too_short_is_absorbed() {
        let pitch = [repeat(3.0, 2), repeat(6.0, 4), repeat(3.0, 7), repeat(5.0, 10)].concat();
        let result = segment(pitch, vec![], None, 0.02);
        assert_eq!(result.notes.len(), 2);
        assert_note(&result.notes[0], 0.13, 3.0, false);
        assert_note(&result.notes[1], 0.1, 5.0, true);
    }

    #[test]
    fn test_notes_too_close_are_merged() {
        // Peaks near 3.05 and 3.40, the upper one is shorter
        let pitch = [repeat(3.0, 11), repeat(3.5, 9)].concat();
        let result = segment(pitch, vec![], None, 0.02);
        assert_eq!(result.notes.len(), 1);
        assert_note(&result.notes[0], 0.2, 3.045, false);
    }

    #[test]
    fn test_input_mask_splits_a_note() {
        let mut mask = vec![false; 19];
        mask[9] = true;
        let result = segment(repeat(3.0, 19), vec![], Some(mask), 0.02);
        assert_eq!(result.notes.len(), 3);
        assert_note(&result.notes[0], 0.09, 3.0, false);
        assert!(!result.notes[1].is_a_note);
        assert!((result.notes[1].length_s - 0.01).abs() < 1e-9);
        assert_note(&result.notes[2], 0.09, 3.0, false);
    }

    #[test]
    fn test_runs_cover_every_sample() {
        let pitch: Vec<f64> = (0..60).map(|k| 10.0 + (k / 15) as f64 * 2.0 + 0.05 * ((k % 3) as f64)).collect();
        let runs = HistogramSegmentation::default()
            .recover_steps(&pitch, 0.01, &params(0.02))
            .unwrap();
        assert_eq!(runs.iter().map(|r| r.count).sum::<usize>(), pitch.len());
        assert_eq!(runs.len(), 4);
        for pair in runs.windows(2) {
            assert!(pair[1].pitch_st > pair[0].pitch_st);
        }
    }

    #[test]
    fn test_invalid_strategy_inputs() {
        let strategy = HistogramSegmentation::default();
        assert!(strategy.recover_steps(&[NAN, NAN], 0.01, &params(0.02)).is_err());
        assert!(strategy.recover_steps(&[1.0, 1.0], 0.0, &params(0.02)).is_err());
        let config = HistogramConfig {
            bin_width_st: 0.0,
            ..HistogramConfig::default()
        };
        assert!(HistogramSegmentation::new(&config).is_err());
    }

    #[test]
    fn test_delete_too_close_keeps_longer_level() {
        let mut levels = vec![
            Level { length_s: 0.3, value_st: 10.0 },
            Level { length_s: 0.1, value_st: 10.4 },
            Level { length_s: 0.2, value_st: 14.0 },
        ];
        delete_too_close(&mut levels, 2.0 / 3.0);
        assert_eq!(
            levels,
            vec![
                Level { length_s: 0.3, value_st: 10.0 },
                Level { length_s: 0.2, value_st: 14.0 },
            ]
        );
    }

    #[test]
    fn test_delete_too_close_repeats_on_closest_pair() {
        let mut levels = vec![
            Level { length_s: 0.1, value_st: 5.0 },
            Level { length_s: 0.4, value_st: 5.5 },
            Level { length_s: 0.2, value_st: 5.6 },
            Level { length_s: 0.3, value_st: 6.0 },
        ];
        delete_too_close(&mut levels, 2.0 / 3.0);
        assert_eq!(levels, vec![Level { length_s: 0.4, value_st: 5.5 }]);
    }

    #[test]
    fn test_single_bin_group_keeps_one_level() {
        let runs = HistogramSegmentation::default()
            .recover_steps(&[4.004, 4.006], 0.01, &params(0.02))
            .unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].count, 2);
        assert!((runs[0].pitch_st - 4.005).abs() < 1e-9);
    }

    #[test]
    fn test_flat_histogram_falls_back_to_highest_bin() {
        let strategy = HistogramSegmentation::default();
        let histo = strategy.pitch_histogram(&[4.004, 4.014]).unwrap();
        assert_eq!(histo.data.len(), 2);
        assert_eq!(histo.data[0], histo.data[1]);
        let levels = strategy.candidate_levels(&histo, 0.01).unwrap();
        assert_eq!(levels.len(), 1);
        assert!((levels[0].value_st - 4.015).abs() < 1e-9);
    }

    #[test]
    fn test_delete_too_short_keeps_one() {
        let mut levels = vec![
            Level { length_s: 0.01, value_st: 1.0 },
            Level { length_s: 0.02, value_st: 2.0 },
        ];
        delete_too_short(&mut levels, 0.05);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].value_st, 2.0);
    }
}
