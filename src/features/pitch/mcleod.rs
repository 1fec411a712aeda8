//! McLeod pitch method
//!
//! Estimates the fundamental frequency of a window from the peaks of its
//! normalized autocorrelation.
//!
//! # Algorithm
//!
//! 1. Remove the mean and compute the autocorrelation `r(τ)` with an FFT:
//!    `ACF = IFFT(|FFT(x)|²)` on a zero-padded buffer
//! 2. Normalize: `n(τ) = r(τ) / r(0)`
//! 3. Skip the central lobe (up to the first negative zero crossing) and keep
//!    the highest maximum of every positive lobe
//! 4. Refine each maximum above `small_cutoff` with a parabola through the
//!    three neighboring lags
//! 5. Pick the first refined maximum reaching `cutoff × highest amplitude`;
//!    the pitch is `sample_rate / lag`
//!
//! # Reference
//!
//! McLeod, P., & Wyvill, G. (2005). A Smarter Way to Find Pitch.
//! *Proceedings of the International Computer Music Conference*.
//!
//! # Example
//!
//! ```no_run
//! use scorelisto::features::pitch::{McLeodPitch, PitchEstimator};
//!
//! let window: Vec<f32> = (0..1000)
//!     .map(|k| (2.0 * std::f32::consts::PI * 440.0 * k as f32 / 44100.0).sin())
//!     .collect();
//! let pitch = McLeodPitch::default().estimate(&window, 44100.0);
//! assert!(pitch.is_some());
//! ```

use super::PitchEstimator;
use crate::config::McLeodConfig;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::cell::RefCell;

thread_local! {
    static PLANNER: RefCell<FftPlanner<f64>> = RefCell::new(FftPlanner::new());
}

/// McLeod pitch estimator
#[derive(Debug, Clone, Default)]
pub struct McLeodPitch {
    config: McLeodConfig,
}

impl McLeodPitch {
    /// Estimator with the given thresholds
    pub fn new(config: McLeodConfig) -> Self {
        Self { config }
    }

    /// Thresholds in use
    pub fn config(&self) -> &McLeodConfig {
        &self.config
    }
}

impl PitchEstimator for McLeodPitch {
    fn estimate(&self, window: &[f32], sample_rate_hz: f64) -> Option<f64> {
        let nsdf = normalized_autocorrelation(window)?;
        let maxima = pick_peaks(&nsdf);

        let mut highest = f64::NEG_INFINITY;
        let mut estimates: Vec<(f64, f64)> = Vec::new();
        for &tau in &maxima {
            highest = highest.max(nsdf[tau]);
            if nsdf[tau] > self.config.small_cutoff {
                let (period, amplitude) = parabolic_interpolation(&nsdf, tau);
                estimates.push((period, amplitude));
                highest = highest.max(amplitude);
            }
        }
        if estimates.is_empty() {
            return None;
        }

        let threshold = self.config.cutoff * highest;
        let (period, _) = estimates
            .iter()
            .copied()
            .find(|&(_, amplitude)| amplitude >= threshold)
            .unwrap_or(estimates[0]);
        let pitch = sample_rate_hz / period;
        (pitch > self.config.lower_pitch_cutoff_hz).then_some(pitch)
    }
}

/// Mean-removed autocorrelation divided by its value at lag 0
///
/// `None` for windows shorter than 3 samples or with no energy.
fn normalized_autocorrelation(window: &[f32]) -> Option<Vec<f64>> {
    let n = window.len();
    if n < 3 {
        return None;
    }
    let mean = window.iter().map(|&s| s as f64).sum::<f64>() / n as f64;

    let fft_size = (2 * n).next_power_of_two();
    let mut buffer: Vec<Complex<f64>> = window
        .iter()
        .map(|&s| Complex::new(s as f64 - mean, 0.0))
        .collect();
    buffer.resize(fft_size, Complex::new(0.0, 0.0));

    PLANNER.with(|planner| {
        let mut planner = planner.borrow_mut();
        planner.plan_fft_forward(fft_size).process(&mut buffer);
        for x in &mut buffer {
            *x = *x * x.conj();
        }
        planner.plan_fft_inverse(fft_size).process(&mut buffer);
    });

    let acf0 = buffer[0].re;
    if !(acf0 > 0.0) {
        return None;
    }
    Some(buffer[..n].iter().map(|x| x.re / acf0).collect())
}

/// Highest maximum of each positive lobe after the first negative crossing
fn pick_peaks(nsdf: &[f64]) -> Vec<usize> {
    let n = nsdf.len();
    let mut maxima = Vec::new();
    let mut pos = 0;
    let mut current_max = 0;

    while pos < (n - 1) / 3 && nsdf[pos] > 0.0 {
        pos += 1;
    }
    while pos < n - 1 && nsdf[pos] <= 0.0 {
        pos += 1;
    }
    if pos == 0 {
        pos = 1;
    }

    while pos < n - 1 {
        if nsdf[pos] > nsdf[pos - 1] && nsdf[pos] >= nsdf[pos + 1] {
            if current_max == 0 || nsdf[pos] > nsdf[current_max] {
                current_max = pos;
            }
        }
        pos += 1;
        if pos < n - 1 && nsdf[pos] <= 0.0 {
            if current_max > 0 {
                maxima.push(current_max);
                current_max = 0;
            }
            while pos < n - 1 && nsdf[pos] <= 0.0 {
                pos += 1;
            }
        }
    }
    if current_max > 0 {
        maxima.push(current_max);
    }
    maxima
}

/// Vertex `(lag, amplitude)` of the parabola through `tau - 1`, `tau`, `tau + 1`
fn parabolic_interpolation(nsdf: &[f64], tau: usize) -> (f64, f64) {
    let a = nsdf[tau - 1];
    let b = nsdf[tau];
    let c = nsdf[tau + 1];
    let bottom = c + a - 2.0 * b;
    if bottom == 0.0 {
        return (tau as f64, b);
    }
    let delta = a - c;
    (tau as f64 + delta / (2.0 * bottom), b - delta * delta / (8.0 * bottom))
}
