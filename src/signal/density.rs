//! Histograms and Gaussian kernel density estimation

use crate::error::{Result, TranscriptionError};
use rayon::prelude::*;
use std::f64::consts::PI;

/// Histogram with `data.len() + 1` bin edges
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Bin edges, `x[k]..x[k + 1]` is bin `k`
    pub x: Vec<f64>,
    /// Bin contents (counts, or smoothed counts)
    pub data: Vec<f64>,
}

/// Count `data` into `bins` equal bins spanning `[range_min, range_max]`
///
/// Bins are half-open `[x_k, x_{k+1})` except the last one which also holds
/// its right edge. Values outside the range are ignored.
///
/// # Errors
///
/// Returns `InvalidInput` if `data` is empty, `bins` is 0 or the range is empty
pub fn histogram(data: &[f64], bins: usize, range_min: f64, range_max: f64) -> Result<Histogram> {
    if data.is_empty() {
        return Err(TranscriptionError::InvalidInput("Empty histogram input".to_string()));
    }
    if bins == 0 || !(range_max > range_min) {
        return Err(TranscriptionError::InvalidInput(format!(
            "Invalid histogram layout: {} bins over [{}, {}]",
            bins, range_min, range_max
        )));
    }

    let step = (range_max - range_min) / bins as f64;
    let x: Vec<f64> = (0..=bins).map(|k| range_min + step * k as f64).collect();
    let mut counts = vec![0.0; bins];

    for &value in data {
        // Number of edges lower than or equal to the value
        let above = x.partition_point(|&edge| edge <= value);
        if above >= 1 && above <= bins {
            counts[above - 1] += 1.0;
        } else if above == bins + 1 && value == x[bins] {
            counts[bins - 1] += 1.0;
        }
    }

    Ok(Histogram { x, data: counts })
}

/// `bins + 1` evenly spaced points spanning the range of `signal`
///
/// # Errors
///
/// Returns `InvalidInput` if `signal` holds fewer than two samples
pub fn histogram_points(signal: &[f64], bins: usize) -> Result<Vec<f64>> {
    if signal.len() < 2 {
        return Err(TranscriptionError::InvalidInput(
            "Histogram points need at least two samples".to_string(),
        ));
    }
    let (min, max) = signal
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let step = (max - min) / bins as f64;
    Ok((0..=bins).map(|k| min + step * k as f64).collect())
}

/// One-dimensional Gaussian kernel density estimate
///
/// The kernel variance is the sample variance of the dataset scaled by
/// `factor²`, so `factor` plays the role of a relative bandwidth.
#[derive(Debug, Clone)]
pub struct GaussianKde {
    dataset: Vec<f64>,
    inv_cov: f64,
    norm_factor: f64,
}

impl GaussianKde {
    /// Build the estimator
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the dataset holds fewer than two values, has
    /// zero variance, or `factor` is not positive
    pub fn new(dataset: &[f64], factor: f64) -> Result<Self> {
        if dataset.len() < 2 {
            return Err(TranscriptionError::InvalidInput(
                "Kernel density estimation needs at least two values".to_string(),
            ));
        }
        if !(factor > 0.0) {
            return Err(TranscriptionError::InvalidInput(format!(
                "Bandwidth factor must be positive, got {}",
                factor
            )));
        }
        let n = dataset.len() as f64;
        let mean = dataset.iter().sum::<f64>() / n;
        let variance = dataset.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        if !(variance > 0.0) {
            return Err(TranscriptionError::InvalidInput(
                "Kernel density estimation needs a non-constant dataset".to_string(),
            ));
        }
        let covariance = variance * factor * factor;
        Ok(Self {
            dataset: dataset.to_vec(),
            inv_cov: 1.0 / covariance,
            norm_factor: (2.0 * PI * covariance).sqrt() * n,
        })
    }

    /// Evaluate the density at each point
    pub fn evaluate(&self, points: &[f64]) -> Vec<f64> {
        points
            .par_iter()
            .map(|&p| {
                let sum: f64 = self
                    .dataset
                    .iter()
                    .map(|&d| {
                        let diff = d - p;
                        (-diff * diff * self.inv_cov / 2.0).exp()
                    })
                    .sum();
                sum / self.norm_factor
            })
            .collect()
    }
}
