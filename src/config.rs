//! Configuration parameters for the transcription pipeline
//!
//! Each stage has its own parameter struct; [`TranscriptionConfig`] bundles
//! them for the full pipeline and for JSON persistence. Every struct is
//! `#[serde(default)]`, so a partial file only overrides the fields it names.

use crate::error::{Result, TranscriptionError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Default reference pitch: C1, the 0 semitone of every pitch track
pub const DEFAULT_REFERENCE_PITCH_HZ: f64 = 32.7032;

/// Window framing parameters for reading an audio source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Analysis window length in seconds (default: 0.02)
    pub window_s: f64,

    /// Hop between successive window starts in seconds (default: 0.001)
    pub period_s: f64,

    /// Resample the stream to this rate before framing (default: None, native rate)
    pub resample_rate_hz: Option<u32>,

    /// Stream to extract (default: 0)
    pub stream_index: usize,

    /// Crop start in seconds (default: None, start of stream)
    pub time_start_s: Option<f64>,

    /// Crop stop in seconds (default: None, end of stream)
    pub time_stop_s: Option<f64>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            window_s: 0.02,
            period_s: 0.001,
            resample_rate_hz: None,
            stream_index: 0,
            time_start_s: None,
            time_stop_s: None,
        }
    }
}

impl ReaderConfig {
    /// Check that window and period are usable
    pub fn validate(&self) -> Result<()> {
        if !(self.window_s > 0.0) {
            return Err(TranscriptionError::InvalidInput(format!(
                "Window length must be positive, got {}",
                self.window_s
            )));
        }
        if !(self.period_s > 0.0) {
            return Err(TranscriptionError::InvalidInput(format!(
                "Window period must be positive, got {}",
                self.period_s
            )));
        }
        if let (Some(start), Some(stop)) = (self.time_start_s, self.time_stop_s) {
            if stop <= start {
                return Err(TranscriptionError::InvalidInput(format!(
                    "Empty time range [{}, {})",
                    start, stop
                )));
            }
        }
        if self.resample_rate_hz == Some(0) {
            return Err(TranscriptionError::InvalidInput("Invalid target sample rate: 0".to_string()));
        }
        Ok(())
    }
}

/// McLeod pitch method thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McLeodConfig {
    /// Fraction of the highest NSDF peak a key maximum must reach (default: 0.97)
    pub cutoff: f64,

    /// Peaks at or below this NSDF amplitude are not refined (default: 0.5)
    pub small_cutoff: f64,

    /// Estimates at or below this frequency are rejected (default: 50.0 Hz)
    pub lower_pitch_cutoff_hz: f64,
}

impl Default for McLeodConfig {
    fn default() -> Self {
        Self {
            cutoff: 0.97,
            small_cutoff: 0.5,
            lower_pitch_cutoff_hz: 50.0,
        }
    }
}

/// Note segmentation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    /// Shortest note (and voiced group) kept, in seconds (default: 0.1)
    pub min_note_length_s: f64,

    /// Two levels closer than this, in semitones, are merged (default: 2/3)
    pub min_note_gap_st: f64,

    /// Median filter width applied to pitch and energy, in seconds (default: 0.02)
    pub median_filter_width_s: f64,

    /// Lowest admissible pitch in semitones (default: 0.0)
    pub min_pitch_st: f64,

    /// Highest admissible pitch in semitones (default: 200.0)
    pub max_pitch_st: f64,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            min_note_length_s: 0.1,
            min_note_gap_st: 2.0 / 3.0,
            median_filter_width_s: 0.02,
            min_pitch_st: 0.0,
            max_pitch_st: 200.0,
        }
    }
}

/// Histogram segmentation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramConfig {
    /// Histogram bin width in semitones (default: 0.01)
    pub bin_width_st: f64,

    /// Full width at half maximum of the smoothing kernel, in semitones (default: 0.5)
    pub mid_height_width_st: f64,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            bin_width_st: 0.01,
            mid_height_width_st: 0.5,
        }
    }
}

/// Rhythm quantization parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RhythmConfig {
    /// Shortest admissible beat duration in seconds (default: 0.3)
    pub delay_min_s: f64,

    /// Longest admissible beat duration in seconds (default: 1.5)
    pub delay_max_s: f64,

    /// Fit errors at or above this value invalidate a combination (default: 10.0)
    pub error_max: f64,

    /// Largest relative beat duration change between neighbors (default: 0.5)
    pub max_delay_var: f64,

    /// Catalog combinations that must not be used (default: none)
    pub masked_combinations: BTreeSet<String>,

    /// Share of the fit error in transition weights; the rest is tempo consistency (default: 0.5)
    pub delay_weight: f64,
}

impl Default for RhythmConfig {
    fn default() -> Self {
        Self {
            delay_min_s: 0.3,
            delay_max_s: 1.5,
            error_max: 10.0,
            max_delay_var: 0.5,
            masked_combinations: BTreeSet::new(),
            delay_weight: 0.5,
        }
    }
}

impl RhythmConfig {
    /// Check the tempo window and tolerances
    pub fn validate(&self) -> Result<()> {
        if !(self.delay_min_s > 0.0) || !(self.delay_max_s >= self.delay_min_s) {
            return Err(TranscriptionError::InvalidInput(format!(
                "Invalid beat duration range: [{}, {}]",
                self.delay_min_s, self.delay_max_s
            )));
        }
        if !(self.max_delay_var >= 0.0) {
            return Err(TranscriptionError::InvalidInput(format!(
                "Invalid maximum delay variation: {}",
                self.max_delay_var
            )));
        }
        if !(0.0..=1.0).contains(&self.delay_weight) {
            return Err(TranscriptionError::InvalidInput(format!(
                "Delay weight must be within [0, 1], got {}",
                self.delay_weight
            )));
        }
        Ok(())
    }
}

/// Score assembly options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    /// Draw a slur over each run of linked notes (default: false)
    pub slur_linked_notes: bool,
}

/// Full pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Frequency of the 0 semitone (default: 32.7032 Hz)
    pub reference_pitch_hz: f64,
    /// Audio framing
    pub reader: ReaderConfig,
    /// Pitch estimator thresholds
    pub mcleod: McLeodConfig,
    /// Note segmentation
    pub steps: StepConfig,
    /// Histogram strategy
    pub histogram: HistogramConfig,
    /// Rhythm quantizer
    pub rhythm: RhythmConfig,
    /// Score assembly
    pub score: ScoreConfig,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            reference_pitch_hz: DEFAULT_REFERENCE_PITCH_HZ,
            reader: ReaderConfig::default(),
            mcleod: McLeodConfig::default(),
            steps: StepConfig::default(),
            histogram: HistogramConfig::default(),
            rhythm: RhythmConfig::default(),
            score: ScoreConfig::default(),
        }
    }
}

impl TranscriptionConfig {
    /// Load a configuration from a JSON file and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TranscriptionConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        if !(self.reference_pitch_hz > 0.0) {
            return Err(TranscriptionError::InvalidInput(format!(
                "Reference pitch must be positive, got {}",
                self.reference_pitch_hz
            )));
        }
        self.reader.validate()?;
        self.rhythm.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(TranscriptionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "steps": { "min_note_length_s": 0.05 }, "rhythm": { "masked_combinations": ["T_EN_EN_EN"] } }"#;
        let config: TranscriptionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.steps.min_note_length_s, 0.05);
        assert_eq!(config.steps.median_filter_width_s, 0.02);
        assert!(config.rhythm.masked_combinations.contains("T_EN_EN_EN"));
        assert_eq!(config.rhythm.delay_max_s, 1.5);
        assert_eq!(config.reference_pitch_hz, DEFAULT_REFERENCE_PITCH_HZ);
    }

    #[test]
    fn test_invalid_rhythm_window() {
        let config = RhythmConfig {
            delay_min_s: 1.0,
            delay_max_s: 0.5,
            ..RhythmConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let path = std::env::temp_dir().join("scorelisto_config_roundtrip.json");
        let mut config = TranscriptionConfig::default();
        config.score.slur_linked_notes = true;
        config.save(&path).unwrap();
        let loaded = TranscriptionConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_file(&path);
    }
}
