//! Audio source abstraction consumed by the pitch track builder

use crate::config::ReaderConfig;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Description of one audio stream of a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Position of the stream in the source
    pub index: usize,
    /// Codec short name ("pcm_s16le", "flac", "memory"...)
    pub codec: String,
    /// Channel count of the original stream
    pub channels: usize,
    /// Native sample rate in Hz
    pub sample_rate_hz: u32,
    /// Number of frames
    pub frames: u64,
    /// Duration in seconds
    pub duration_s: f64,
    /// Bit rate in bits per second, when known
    pub bit_rate: Option<u64>,
}

/// Sequential producer of fixed-length analysis windows
///
/// Call [`AudioSource::init_extraction`] first, then pull windows with
/// [`AudioSource::next_buffer`] until it returns `None`.
pub trait AudioSource {
    /// Streams available in this source
    fn streams(&self) -> Vec<StreamInfo>;

    /// Prepare window extraction from one stream
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the stream does not exist or the
    /// framing parameters are invalid
    fn init_extraction(&mut self, request: &ReaderConfig) -> Result<()>;

    /// Sample rate of the produced windows
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if extraction has not been initialized
    fn output_sample_rate(&self) -> Result<u32>;

    /// Duration in seconds covered by the current extraction
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if extraction has not been initialized
    fn extraction_duration_s(&self) -> Result<f64>;

    /// Next window of samples, `None` at end of stream
    fn next_buffer(&mut self) -> Option<Vec<f32>>;
}
