//! Sample rate conversion

use crate::error::{Result, TranscriptionError};

/// Resample a mono signal with linear interpolation
///
/// # Arguments
///
/// * `samples` - Mono input
/// * `from_rate` - Input sample rate in Hz
/// * `to_rate` - Output sample rate in Hz
///
/// # Returns
///
/// Resampled signal of `round(len * to_rate / from_rate)` samples
///
/// # Errors
///
/// Returns `InvalidInput` if either rate is 0
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == 0 || to_rate == 0 {
        return Err(TranscriptionError::InvalidInput(format!(
            "Invalid resampling rates: {} Hz -> {} Hz",
            from_rate, to_rate
        )));
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    log::debug!("Resampling {} samples from {} Hz to {} Hz", samples.len(), from_rate, to_rate);

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 / ratio).round() as usize;
    let last = samples.len() - 1;
    Ok((0..out_len)
        .map(|k| {
            let position = k as f64 * ratio;
            let left = (position.floor() as usize).min(last);
            let right = (left + 1).min(last);
            let frac = (position - left as f64) as f32;
            samples[left] + (samples[right] - samples[left]) * frac.clamp(0.0, 1.0)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsample_interpolates() {
        let out = resample_linear(&[0.0, 1.0, 0.0], 1, 2).unwrap();
        assert_eq!(out.len(), 6);
        assert_eq!(&out[..4], &[0.0, 0.5, 1.0, 0.5]);
    }

    #[test]
    fn test_downsample_length() {
        let input = vec![0.5f32; 48000];
        let out = resample_linear(&input, 48000, 44100).unwrap();
        assert_eq!(out.len(), 44100);
        assert!(out.iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_invalid_rates() {
        assert!(resample_linear(&[0.0], 0, 44100).is_err());
    }
}
