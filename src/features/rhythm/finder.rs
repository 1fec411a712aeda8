//! Scoring of catalog combinations against measured lengths
//!
//! Each element length is compared to the share of the combination's beats
//! its notated value takes. A `None` length marks the synthetic leading rest:
//! its share is fixed at the ideal value and the measured elements are
//! renormalized over the remaining share.
//!
//! # Algorithm
//!
//! For ideal ratios `r_k = duration_k / (DIVISIONS · beats)` and measured
//! ratios `m_k`:
//!
//! ```text
//! error = total_length · Σ_k sqrt(r_k² + (|r_k − m_k| · beats)²)
//! ```
//!
//! where `total_length` is the length implied for the whole combination.

use super::catalog::{catalog, Combination};
use super::DIVISIONS;
use std::collections::BTreeMap;

/// Fit error per matching combination name
pub type CombinationOptions = BTreeMap<&'static str, f64>;

/// Share of the combination taken by each element
pub fn ideal_ratios(comb: &Combination) -> Vec<f64> {
    let span = (DIVISIONS * comb.nb_beats) as f64;
    comb.durations.iter().map(|&d| d as f64 / span).collect()
}

/// Measured length sum and share left to the measured elements
fn free_share(lengths: &[Option<f64>], ideal: &[f64]) -> (f64, f64) {
    let mut measured = 0.0;
    let mut share = 1.0;
    for (length, ratio) in lengths.iter().zip(ideal) {
        match length {
            Some(l) => measured += l,
            None => share -= ratio,
        }
    }
    (measured, share)
}

/// Share taken by each element, fixed elements at their ideal share
pub fn real_ratios(lengths: &[Option<f64>], ideal: &[f64]) -> Vec<f64> {
    let (measured, share) = free_share(lengths, ideal);
    lengths
        .iter()
        .zip(ideal)
        .map(|(length, &ratio)| match length {
            Some(l) => l / measured * share,
            None => ratio,
        })
        .collect()
}

/// Length in seconds implied for the whole combination
pub fn total_length(lengths: &[Option<f64>], ideal: &[f64]) -> f64 {
    let (measured, share) = free_share(lengths, ideal);
    measured / share
}

/// Fit error of `comb` for the measured `lengths`
pub fn fit_error(comb: &Combination, lengths: &[Option<f64>]) -> f64 {
    let ideal = ideal_ratios(comb);
    let real = real_ratios(lengths, &ideal);
    let total = total_length(lengths, &ideal);
    let beats = comb.nb_beats as f64;
    let sum: f64 = ideal
        .iter()
        .zip(&real)
        .map(|(i, r)| {
            let deviation = (i - r).abs() * beats;
            (i * i + deviation * deviation).sqrt()
        })
        .sum();
    sum * total
}

/// Element lengths in seconds if `comb` were played exactly
pub fn corrected_lengths(comb: &Combination, lengths: &[Option<f64>]) -> Vec<f64> {
    let ideal = ideal_ratios(comb);
    let total = total_length(lengths, &ideal);
    ideal.iter().map(|r| r * total).collect()
}

/// Score every combination whose element count, beat count and note/rest
/// pattern match
///
/// Combinations implying no positive length (nothing measured, or no share
/// left for the measured elements) are skipped.
pub fn find_matches(lengths: &[Option<f64>], types: &[bool], nb_beats: u32) -> CombinationOptions {
    let mut options = CombinationOptions::new();
    for (&name, comb) in catalog() {
        if comb.nb_notes() != lengths.len() || comb.nb_beats != nb_beats || comb.types != types {
            continue;
        }
        let (measured, share) = free_share(lengths, &ideal_ratios(comb));
        if !(measured > 0.0) || !(share > 0.0) {
            continue;
        }
        let error = fit_error(comb, lengths);
        if error.is_finite() {
            options.insert(name, error);
        }
    }
    options
}
