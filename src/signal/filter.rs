//! Median filtering, Gaussian kernels and convolution

use crate::error::{Result, TranscriptionError};
use std::cmp::Ordering;

/// NaN-aware median filter
///
/// Each output sample is the median of a `kernel_size` window centered on it.
/// Near the borders the window is pinned to the first (or last) `kernel_size`
/// samples; a signal shorter than the kernel uses the whole signal for every
/// position. A window holding a majority of NaN yields NaN, otherwise the
/// median is taken over its non-NaN values.
///
/// # Arguments
///
/// * `signal` - Input samples, NaN marks missing values
/// * `kernel_size` - Odd window length in samples
///
/// # Returns
///
/// Filtered signal of the same length
///
/// # Errors
///
/// Returns `InvalidInput` if `kernel_size` is even
pub fn median_filter(signal: &[f64], kernel_size: usize) -> Result<Vec<f64>> {
    if kernel_size % 2 == 0 {
        return Err(TranscriptionError::InvalidInput(format!(
            "Median filter kernel size must be odd, got {}",
            kernel_size
        )));
    }
    if kernel_size == 1 {
        return Ok(signal.to_vec());
    }

    let n = signal.len();
    let k_middle = (kernel_size - 1) / 2;
    let mut window: Vec<f64> = Vec::with_capacity(kernel_size);
    let mut filtered = Vec::with_capacity(n);

    for k in 0..n {
        let range = if n < kernel_size {
            0..n
        } else if k < k_middle {
            0..kernel_size
        } else if k + k_middle >= n {
            n - kernel_size..n
        } else {
            k - k_middle..k + k_middle + 1
        };
        let slice = &signal[range];
        let nb_nan = slice.iter().filter(|x| x.is_nan()).count();
        if nb_nan > (slice.len() - 1) / 2 {
            filtered.push(f64::NAN);
            continue;
        }
        window.clear();
        window.extend(slice.iter().copied().filter(|x| !x.is_nan()));
        window.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        filtered.push(window[(window.len() - 1) / 2]);
    }

    Ok(filtered)
}

/// Odd-length Gaussian shape with peak value 1 at the center sample
///
/// # Errors
///
/// Returns `InvalidInput` if `nb_samples` is even or the deviation is not positive
pub fn gaussian(nb_samples: usize, standard_deviation: f64) -> Result<Vec<f64>> {
    if nb_samples % 2 == 0 {
        return Err(TranscriptionError::InvalidInput(format!(
            "Gaussian kernel length must be odd, got {}",
            nb_samples
        )));
    }
    if !(standard_deviation > 0.0) {
        return Err(TranscriptionError::InvalidInput(format!(
            "Gaussian standard deviation must be positive, got {}",
            standard_deviation
        )));
    }
    let middle = ((nb_samples - 1) / 2) as f64;
    Ok((0..nb_samples)
        .map(|i| (-0.5 * ((i as f64 - middle) / standard_deviation).powi(2)).exp())
        .collect())
}

/// Convolution of `a` by `b`, cropped to the length of `a`
///
/// The crop is centered on the kernel: output sample `i` is the full
/// convolution at `i + mid`, with `mid = (len - 1) / 2` for an odd kernel and
/// `len / 2 - 1` for an even one.
pub fn convolve_same(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return vec![0.0; a.len()];
    }
    let middle = if b.len() % 2 == 0 {
        b.len() / 2 - 1
    } else {
        (b.len() - 1) / 2
    };
    (middle..middle + a.len())
        .map(|n| {
            let m_min = (n + 1).saturating_sub(b.len());
            let m_max = (a.len() - 1).min(n);
            (m_min..=m_max).map(|m| a[m] * b[n - m]).sum()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_rejects_even_kernel() {
        assert!(median_filter(&[1.0, 2.0, 3.0], 2).is_err());
    }

    #[test]
    fn test_median_kernel_one_is_identity() {
        let signal = vec![3.0, f64::NAN, 1.0];
        let filtered = median_filter(&signal, 1).unwrap();
        assert_eq!(filtered[0], 3.0);
        assert!(filtered[1].is_nan());
        assert_eq!(filtered[2], 1.0);
    }

    #[test]
    fn test_median_removes_spike() {
        let signal = vec![1.0, 1.0, 9.0, 1.0, 1.0, 2.0, 2.0];
        let filtered = median_filter(&signal, 3).unwrap();
        assert_eq!(filtered, vec![1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_median_nan_handling() {
        // Minority NaN: median of the remaining values
        let filtered = median_filter(&[1.0, f64::NAN, 3.0, 5.0, 7.0], 3).unwrap();
        assert_eq!(filtered[1], 1.0, "Window [1, NaN, 3] keeps the non-NaN median");
        // Majority NaN: stays NaN
        let filtered = median_filter(&[1.0, f64::NAN, f64::NAN, 5.0, 7.0], 3).unwrap();
        assert!(filtered[1].is_nan());
        assert!(filtered[2].is_nan());
        assert_eq!(filtered[3], 5.0);
    }

    #[test]
    fn test_median_last_samples_use_last_window() {
        let signal = vec![0.0, 0.0, 0.0, 4.0, 5.0, 6.0];
        let filtered = median_filter(&signal, 5).unwrap();
        assert_eq!(filtered.len(), signal.len());
        assert_eq!(filtered[4], 4.0);
        assert_eq!(filtered[5], 4.0);
    }

    #[test]
    fn test_median_short_signal() {
        let filtered = median_filter(&[2.0, 8.0, 4.0], 5).unwrap();
        assert_eq!(filtered, vec![4.0, 4.0, 4.0]);
    }

    #[test]
    fn test_gaussian_shape() {
        let g = gaussian(5, 1.0).unwrap();
        assert_eq!(g.len(), 5);
        assert!((g[2] - 1.0).abs() < 1e-12);
        assert!((g[0] - g[4]).abs() < 1e-12);
        assert!((g[1] - (-0.5f64).exp()).abs() < 1e-12);
        assert!(gaussian(4, 1.0).is_err());
    }

    #[test]
    fn test_convolve_same_centered() {
        let a = vec![0.0, 0.0, 1.0, 0.0, 0.0];
        let b = vec![1.0, 2.0, 1.0];
        assert_eq!(convolve_same(&a, &b), vec![0.0, 1.0, 2.0, 1.0, 0.0]);
        let out = convolve_same(&[1.0, 1.0], &[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(out, vec![2.0, 2.0]);
    }
}
