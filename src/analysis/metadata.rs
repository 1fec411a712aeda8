//! Transcription metadata

use serde::{Deserialize, Serialize};

/// Facts about one transcription run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionMetadata {
    /// Library version
    pub algorithm_version: String,

    /// Analyzed audio duration in seconds
    pub duration_s: f64,

    /// Sample rate of the analyzed stream in Hz
    pub sample_rate_hz: u32,

    /// Wall-clock time of the run in milliseconds
    pub processing_time_ms: f64,

    /// Notes and rests found by segmentation
    pub segment_count: usize,

    /// Key name such as `"Eb"` or `"F#m"`
    pub key_name: String,

    /// Non-fatal oddities met on the way
    pub warnings: Vec<String>,
}

impl Default for TranscriptionMetadata {
    fn default() -> Self {
        Self {
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
            duration_s: 0.0,
            sample_rate_hz: 0,
            processing_time_ms: 0.0,
            segment_count: 0,
            key_name: String::new(),
            warnings: vec![],
        }
    }
}
