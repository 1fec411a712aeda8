//! Channel mixing utilities (multi-channel to mono conversion)

use crate::error::{Result, TranscriptionError};

/// Channel mixing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMixMode {
    /// Average of all channels
    #[default]
    Average,
    /// Keep the first channel only
    First,
    /// Per frame, keep the sample with the largest magnitude
    Dominant,
}

/// Convert interleaved multi-channel samples to mono
///
/// # Arguments
///
/// * `interleaved` - Frames of `channels` samples laid out consecutively
/// * `channels` - Number of channels per frame
/// * `mode` - Mixing mode
///
/// # Returns
///
/// One sample per frame; a trailing partial frame is dropped
///
/// # Errors
///
/// Returns `InvalidInput` if `channels` is 0
pub fn downmix(interleaved: &[f32], channels: usize, mode: ChannelMixMode) -> Result<Vec<f32>> {
    if channels == 0 {
        return Err(TranscriptionError::InvalidInput("Channel count must be positive".to_string()));
    }
    if channels == 1 {
        return Ok(interleaved.to_vec());
    }
    let mono = interleaved
        .chunks_exact(channels)
        .map(|frame| match mode {
            ChannelMixMode::Average => frame.iter().sum::<f32>() / channels as f32,
            ChannelMixMode::First => frame[0],
            ChannelMixMode::Dominant => frame
                .iter()
                .copied()
                .fold(0.0f32, |acc, s| if s.abs() > acc.abs() { s } else { acc }),
        })
        .collect();
    Ok(mono)
}
