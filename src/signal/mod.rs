//! Numeric helpers shared by the pipeline stages
//!
//! - Pitch unit conversions (semitones relative to a reference frequency)
//! - Boolean mask combination
//! - Median filtering, Gaussian kernels and "same" convolution ([`filter`])
//! - Histograms and Gaussian kernel density estimation ([`density`])
//! - Local extrema and mode of a sequence ([`extrema`])

pub mod density;
pub mod extrema;
pub mod filter;

use crate::error::{Result, TranscriptionError};

/// Convert a pitch in semitones above `f0_hz` to a frequency
///
/// NaN propagates.
pub fn tone_to_freq(tone_st: f64, f0_hz: f64) -> f64 {
    if tone_st.is_nan() {
        return tone_st;
    }
    f0_hz * 2.0f64.powf(tone_st / 12.0)
}

/// Convert a frequency to semitones above `f0_hz`
///
/// NaN propagates.
pub fn freq_to_tone(freq_hz: f64, f0_hz: f64) -> f64 {
    if freq_hz.is_nan() {
        return freq_hz;
    }
    12.0 * (freq_hz / f0_hz).log2()
}

/// Element-wise OR of two masks of equal length
pub fn mask_or(a: &[bool], b: &[bool]) -> Result<Vec<bool>> {
    if a.len() != b.len() {
        return Err(TranscriptionError::InvalidInput(format!(
            "Mask sizes differ: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    Ok(a.iter().zip(b).map(|(&x, &y)| x || y).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_REFERENCE_PITCH_HZ;

    #[test]
    fn test_tone_freq_conversion() {
        let f0 = DEFAULT_REFERENCE_PITCH_HZ;
        assert!((tone_to_freq(12.0, f0) - 2.0 * f0).abs() < 1e-9);
        assert!((freq_to_tone(440.0, f0) - 45.0).abs() < 1e-3, "A4 is 45 st above C1");
        assert!(freq_to_tone(f64::NAN, f0).is_nan());
        let st = 27.3;
        assert!((freq_to_tone(tone_to_freq(st, f0), f0) - st).abs() < 1e-9);
    }

    #[test]
    fn test_mask_or() {
        let result = mask_or(&[true, false, false], &[false, false, true]).unwrap();
        assert_eq!(result, vec![true, false, true]);
        assert!(mask_or(&[true], &[true, false]).is_err());
    }
}
