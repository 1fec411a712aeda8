//! Masking and voiced-group segmentation of a pitch track

use super::threshold::{CumulativeSumThreshold, HysteresisThreshold};
use super::{AnalogNote, NoteSequence, SegmentationStrategy};
use crate::config::StepConfig;
use crate::error::{Result, TranscriptionError};
use crate::features::pitch::PitchTrack;
use crate::progress::Progress;
use crate::signal::density::{histogram_points, GaussianKde};
use crate::signal::extrema::local_extrema;
use crate::signal::filter::median_filter;
use crate::signal::mask_or;
use std::cmp::Ordering;

const AUTO_ENERGY_BINS: usize = 1000;
const AUTO_ENERGY_INITIAL_FACTOR: f64 = 0.1;
const AUTO_ENERGY_FACTOR_STEP: f64 = 0.01;
const AUTO_ENERGY_MAX_ITERATIONS: usize = 2000;
const AUTO_ENERGY_HYSTERESIS_DB: f64 = 3.0;

/// Segments a pitch track into notes and rests
///
/// Holds the pitch and energy arrays and three masks (`true` = excluded):
/// the explicit mask set by the caller, the pitch mask and the energy mask.
/// The pitch (energy) mask is rebuilt from NaN and negative values whenever
/// the pitch (energy) array is replaced, so median filtering must happen
/// before any additional masking.
///
/// # Example
///
/// ```no_run
/// use scorelisto::features::steps::{HistogramSegmentation, StepSegmenter};
/// use scorelisto::features::pitch::PitchTrack;
/// use scorelisto::config::StepConfig;
/// use scorelisto::progress::Progress;
///
/// let track = PitchTrack::new(0.01, 32.7032, 0.0, vec![40.0; 50], vec![])?;
/// let mut segmenter = StepSegmenter::new(&track, Box::new(HistogramSegmentation::default()))?;
/// let notes = segmenter.perform(&StepConfig::default(), &Progress::new())?;
/// # Ok::<(), scorelisto::TranscriptionError>(())
/// ```
pub struct StepSegmenter {
    pitch_st: Vec<f64>,
    energy: Vec<f64>,
    period_s: f64,
    offset_s: f64,
    mask: Vec<bool>,
    pitch_mask: Vec<bool>,
    energy_mask: Vec<bool>,
    groups: Vec<(usize, usize)>,
    strategy: Box<dyn SegmentationStrategy>,
}

impl std::fmt::Debug for StepSegmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepSegmenter")
            .field("samples", &self.pitch_st.len())
            .field("has_energy", &self.has_energy())
            .field("period_s", &self.period_s)
            .field("groups", &self.groups)
            .finish()
    }
}

impl StepSegmenter {
    /// Segmenter over `track` delegating group quantization to `strategy`
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the track is empty or invalid
    pub fn new(track: &PitchTrack, strategy: Box<dyn SegmentationStrategy>) -> Result<Self> {
        track.validate()?;
        if track.is_empty() {
            return Err(TranscriptionError::InvalidInput("Pitch array cannot be empty".to_string()));
        }
        let mut segmenter = Self {
            pitch_st: track.pitch_st.clone(),
            energy: track.energy.clone(),
            period_s: track.period_s,
            offset_s: track.offset_s,
            mask: vec![false; track.len()],
            pitch_mask: Vec::new(),
            energy_mask: Vec::new(),
            groups: Vec::new(),
            strategy,
        };
        segmenter.reset_pitch_mask();
        segmenter.reset_energy_mask();
        Ok(segmenter)
    }

    /// Segmenter with an initial explicit mask
    pub fn with_mask(
        track: &PitchTrack,
        strategy: Box<dyn SegmentationStrategy>,
        mask: Vec<bool>,
    ) -> Result<Self> {
        let mut segmenter = Self::new(track, strategy)?;
        segmenter.set_mask(mask)?;
        Ok(segmenter)
    }

    /// Current pitch array
    pub fn pitch(&self) -> &[f64] {
        &self.pitch_st
    }

    /// Current energy array (empty when absent)
    pub fn energy(&self) -> &[f64] {
        &self.energy
    }

    /// True when energy values are present
    pub fn has_energy(&self) -> bool {
        !self.energy.is_empty()
    }

    /// Explicit mask
    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    /// Mask derived from the pitch array
    pub fn pitch_mask(&self) -> &[bool] {
        &self.pitch_mask
    }

    /// Mask derived from the energy array (empty when energy is absent)
    pub fn energy_mask(&self) -> &[bool] {
        &self.energy_mask
    }

    /// Voiced groups found by the last [`StepSegmenter::detect_groups`], as `[start, stop)`
    pub fn groups(&self) -> &[(usize, usize)] {
        &self.groups
    }

    /// Replace the pitch array and rebuild the pitch mask
    pub fn set_pitch(&mut self, pitch_st: Vec<f64>) -> Result<()> {
        self.check_len(pitch_st.len(), "Pitch")?;
        self.pitch_st = pitch_st;
        self.reset_pitch_mask();
        Ok(())
    }

    /// Replace the energy array and rebuild the energy mask
    pub fn set_energy(&mut self, energy: Vec<f64>) -> Result<()> {
        self.check_len(energy.len(), "Energy")?;
        self.energy = energy;
        self.reset_energy_mask();
        Ok(())
    }

    /// Replace the explicit mask
    pub fn set_mask(&mut self, mask: Vec<bool>) -> Result<()> {
        self.check_len(mask.len(), "Mask")?;
        self.mask = mask;
        Ok(())
    }

    fn check_len(&self, len: usize, what: &str) -> Result<()> {
        if len != self.pitch_st.len() {
            return Err(TranscriptionError::InvalidInput(format!(
                "{} array size {} differs from pitch array size {}",
                what,
                len,
                self.pitch_st.len()
            )));
        }
        Ok(())
    }

    fn require_energy(&self) -> Result<()> {
        if !self.has_energy() {
            return Err(TranscriptionError::InvalidInput("Energy is not provided".to_string()));
        }
        Ok(())
    }

    fn reset_pitch_mask(&mut self) {
        self.pitch_mask = self.pitch_st.iter().map(|&p| p.is_nan() || p < 0.0).collect();
    }

    fn reset_energy_mask(&mut self) {
        self.energy_mask = self.energy.iter().map(|&e| e.is_nan() || e < 0.0).collect();
    }

    /// OR of the explicit, pitch and energy masks
    pub fn combined_mask(&self) -> Result<Vec<bool>> {
        let mask = mask_or(&self.mask, &self.pitch_mask)?;
        if self.has_energy() {
            return mask_or(&mask, &self.energy_mask);
        }
        Ok(mask)
    }

    /// Mask samples whose pitch lies outside `[tone_min, tone_max]`
    pub fn mask_through_tone_height(&mut self, tone_min: f64, tone_max: f64) {
        for (masked, &pitch) in self.pitch_mask.iter_mut().zip(&self.pitch_st) {
            *masked = *masked || pitch < tone_min || pitch > tone_max;
        }
    }

    /// Mask inactive samples of a hysteresis threshold on energy
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if energy is absent or `threshold_on <= threshold_off`
    pub fn mask_through_energy_hysteresis(&mut self, threshold_off: f64, threshold_on: f64) -> Result<()> {
        self.require_energy()?;
        let threshold = HysteresisThreshold::new(threshold_off, threshold_on, true, false, false)?;
        let mask = threshold.perform(&self.energy);
        self.energy_mask = mask_or(&mask, &self.energy_mask)?;
        Ok(())
    }

    /// Mask energy runs whose cumulative sum stays below `cumsum_min`
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if energy is absent
    pub fn mask_through_energy_cumsum(&mut self, threshold_min: f64, cumsum_min: f64) -> Result<()> {
        self.require_energy()?;
        let mask = CumulativeSumThreshold::new(threshold_min, cumsum_min, true).perform(&self.energy);
        self.energy_mask = mask_or(&mask, &self.energy_mask)?;
        Ok(())
    }

    /// Median filter the pitch array; `window_s` is rounded to an odd sample count
    pub fn median_filter_pitch(&mut self, window_s: f64) -> Result<()> {
        let kernel = self.kernel_size(window_s)?;
        let filtered = median_filter(&self.pitch_st, kernel)?;
        self.set_pitch(filtered)
    }

    /// Median filter the energy array; `window_s` is rounded to an odd sample count
    pub fn median_filter_energy(&mut self, window_s: f64) -> Result<()> {
        self.require_energy()?;
        let kernel = self.kernel_size(window_s)?;
        let filtered = median_filter(&self.energy, kernel)?;
        self.set_energy(filtered)
    }

    fn kernel_size(&self, window_s: f64) -> Result<usize> {
        if !(window_s > 0.0) {
            return Err(TranscriptionError::InvalidInput(format!(
                "Median filter width must be positive, got {}",
                window_s
            )));
        }
        let kernel = (window_s / self.period_s).round() as usize;
        Ok(if kernel % 2 == 0 { kernel + 1 } else { kernel })
    }

    /// Voice-activity mask from the bimodal distribution of energy
    ///
    /// The log-energy density is estimated with a Gaussian KDE whose bandwidth
    /// grows until at most two modes remain. The density minimum between the
    /// noise and signal modes gives the activation threshold, with a 3 dB lower
    /// deactivation threshold.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if energy is absent and `Infeasible` if the
    /// distribution does not show exactly two modes
    pub fn mask_auto_energy(&mut self) -> Result<()> {
        self.require_energy()?;
        let energy_db: Vec<f64> = self
            .energy
            .iter()
            .map(|&e| 10.0 * e.log10())
            .filter(|v| v.is_finite())
            .collect();
        log::debug!("Auto energy masking over {} finite samples", energy_db.len());

        let infeasible = || TranscriptionError::Infeasible("Auto masking energy failed".to_string());
        if energy_db.len() < 2 {
            return Err(infeasible());
        }
        let points = histogram_points(&energy_db, AUTO_ENERGY_BINS)?;
        let mut factor = AUTO_ENERGY_INITIAL_FACTOR;
        let kde = GaussianKde::new(&energy_db, factor).map_err(|_| infeasible())?;
        let mut density = kde.evaluate(&points);
        let mut maxima = local_extrema(&density, false, true)?;
        let mut iterations = 0;
        while maxima.len() > 2 && iterations < AUTO_ENERGY_MAX_ITERATIONS {
            factor += AUTO_ENERGY_FACTOR_STEP;
            density = GaussianKde::new(&energy_db, factor)?.evaluate(&points);
            maxima = local_extrema(&density, false, true)?;
            iterations += 1;
        }
        if maxima.len() != 2 {
            log::warn!("Energy distribution has {} modes, expected 2", maxima.len());
            return Err(infeasible());
        }

        let (noise, signal) = (maxima[0], maxima[1]);
        let minimum = (noise..signal)
            .min_by(|&a, &b| density[a].partial_cmp(&density[b]).unwrap_or(Ordering::Equal))
            .unwrap_or(noise);
        let threshold_db = points[minimum] + (points[1] - points[0]) / 2.0;
        let threshold_on = 10f64.powf(threshold_db / 10.0);
        let threshold_off = 10f64.powf((threshold_db - AUTO_ENERGY_HYSTERESIS_DB) / 10.0);
        log::debug!(
            "Auto energy threshold {:.2} dB (bandwidth factor {:.2})",
            threshold_db,
            factor
        );
        self.mask_through_energy_hysteresis(threshold_off, threshold_on)
    }

    /// Find unmasked runs of at least `min_length_s`
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `min_length_s` is negative
    pub fn detect_groups(&mut self, min_length_s: f64) -> Result<()> {
        if min_length_s < 0.0 {
            return Err(TranscriptionError::InvalidInput(format!(
                "Minimum note length cannot be negative, got {}",
                min_length_s
            )));
        }
        let min_samples = (min_length_s / self.period_s).round() as usize;
        let mask = self.combined_mask()?;

        self.groups.clear();
        let mut start = None;
        for (k, &masked) in mask.iter().enumerate() {
            match (masked, start) {
                (false, None) => start = Some(k),
                (true, Some(s)) => {
                    if k - s >= min_samples.max(1) {
                        self.groups.push((s, k));
                    }
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            if mask.len() - s >= min_samples.max(1) {
                self.groups.push((s, mask.len()));
            }
        }
        log::debug!("Detected {} voiced groups", self.groups.len());
        Ok(())
    }

    fn mean_energy(&self, start: usize, stop: usize) -> f64 {
        if !self.has_energy() || stop <= start {
            return f64::NAN;
        }
        self.energy[start..stop].iter().sum::<f64>() / (stop - start) as f64
    }

    /// Quantize every voiced group and assemble the note sequence
    ///
    /// # Errors
    ///
    /// Returns `Infeasible` if no group was detected, `Cancelled` on request,
    /// and any strategy error
    pub fn extract_notes(&self, params: &StepConfig, progress: &Progress) -> Result<NoteSequence> {
        let (first, _) = *self
            .groups
            .first()
            .ok_or_else(|| TranscriptionError::Infeasible("No groups of note detected".to_string()))?;

        let mut sequence = NoteSequence {
            offset_s: self.offset_s + first as f64 * self.period_s,
            notes: Vec::new(),
        };
        for (index, &(start, stop)) in self.groups.iter().enumerate() {
            progress.checkpoint()?;
            if index > 0 {
                let previous_stop = self.groups[index - 1].1;
                sequence
                    .notes
                    .push(AnalogNote::rest((start - previous_stop) as f64 * self.period_s));
            }
            let runs = self
                .strategy
                .recover_steps(&self.pitch_st[start..stop], self.period_s, params)?;
            let mut k_start = start;
            for (step, run) in runs.iter().enumerate() {
                let k_stop = k_start + run.count;
                sequence.notes.push(AnalogNote::note(
                    run.count as f64 * self.period_s,
                    run.pitch_st,
                    self.mean_energy(k_start, k_stop.min(stop)),
                    step > 0,
                ));
                k_start = k_stop;
            }
            if k_start != stop {
                return Err(TranscriptionError::InternalError(format!(
                    "Segmentation covers {} samples of a {} samples group",
                    k_start - start,
                    stop - start
                )));
            }
        }
        Ok(sequence)
    }

    /// Full segmentation
    ///
    /// Median filters the pitch, and when energy is present median filters
    /// it and applies [`StepSegmenter::mask_auto_energy`]; then masks the
    /// pitch range, detects voiced groups and extracts the notes.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` if a cancellation is requested before a phase,
    /// `Infeasible` if masking leaves no usable group
    pub fn perform(&mut self, params: &StepConfig, progress: &Progress) -> Result<NoteSequence> {
        log::debug!(
            "Segmenting {} samples: min length {} s, min gap {} st, pitch range [{}, {}]",
            self.pitch_st.len(),
            params.min_note_length_s,
            params.min_note_gap_st,
            params.min_pitch_st,
            params.max_pitch_st
        );
        progress.report(0.0)?;
        self.median_filter_pitch(params.median_filter_width_s)?;
        progress.checkpoint()?;
        if self.has_energy() {
            self.median_filter_energy(params.median_filter_width_s)?;
            self.mask_auto_energy()?;
        }
        progress.report(25.0)?;
        self.mask_through_tone_height(params.min_pitch_st, params.max_pitch_st);
        progress.report(50.0)?;
        self.detect_groups(params.min_note_length_s)?;
        progress.report(75.0)?;
        let sequence = self.extract_notes(params, progress)?;
        progress.set(100.0);
        log::debug!("Segmentation produced {} notes and rests", sequence.notes.len());
        Ok(sequence)
    }
}
