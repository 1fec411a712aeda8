//! Local extrema and mode of a sequence

use crate::error::{Result, TranscriptionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slope {
    Rising,
    Falling,
    Flat,
}

/// Indices of the local extrema of `signal`
///
/// Plateaus report their rounded midpoint. With `border`, the first and the
/// last sample may also count as extrema: the initial slope marks the midpoint
/// of the leading plateau as a minimum (rising) or maximum (falling), and a
/// final rising (falling) step marks the last sample as a maximum (minimum).
/// A flat signal has no extrema.
///
/// # Arguments
///
/// * `signal` - Input sequence
/// * `border` - Whether the borders may be extrema
/// * `maxima` - Return maxima when true, minima otherwise
///
/// # Errors
///
/// Returns `InvalidInput` if the signal holds fewer than two samples
pub fn local_extrema(signal: &[f64], border: bool, maxima: bool) -> Result<Vec<usize>> {
    if signal.len() < 2 {
        return Err(TranscriptionError::InvalidInput(format!(
            "Cannot extract local extrema of a signal with {} samples",
            signal.len()
        )));
    }
    let last = signal.len() - 1;
    let mut minima_idx = Vec::new();
    let mut maxima_idx = Vec::new();

    // Leading plateau
    let mut previous = Slope::Flat;
    let mut start = 1;
    while start < signal.len() {
        if signal[start] > signal[start - 1] {
            if border {
                minima_idx.push(half_round(start - 1));
                if start == last {
                    maxima_idx.push(start);
                }
            }
            previous = Slope::Rising;
            break;
        } else if signal[start] < signal[start - 1] {
            if border {
                maxima_idx.push(half_round(start - 1));
                if start == last {
                    minima_idx.push(start);
                }
            }
            previous = Slope::Falling;
            break;
        }
        start += 1;
    }
    if previous == Slope::Flat {
        return Ok(Vec::new());
    }

    let mut plateau_start = 0;
    let mut before_plateau = Slope::Flat;
    for ind in start + 1..signal.len() {
        let current = if signal[ind] > signal[ind - 1] {
            Slope::Rising
        } else if signal[ind] == signal[ind - 1] {
            Slope::Flat
        } else {
            Slope::Falling
        };
        match current {
            Slope::Flat => {
                if previous != Slope::Flat {
                    plateau_start = ind - 1;
                    before_plateau = previous;
                }
            }
            Slope::Rising => {
                if previous == Slope::Falling {
                    minima_idx.push(ind - 1);
                } else if previous == Slope::Flat && before_plateau == Slope::Falling {
                    minima_idx.push(half_round(plateau_start + ind - 1));
                }
                if ind == last && border {
                    maxima_idx.push(ind);
                }
            }
            Slope::Falling => {
                if previous == Slope::Rising {
                    maxima_idx.push(ind - 1);
                } else if previous == Slope::Flat && before_plateau == Slope::Rising {
                    maxima_idx.push(half_round(plateau_start + ind - 1));
                }
                if ind == last && border {
                    minima_idx.push(ind);
                }
            }
        }
        previous = current;
    }

    Ok(if maxima { maxima_idx } else { minima_idx })
}

fn half_round(sum: usize) -> usize {
    (sum as f64 / 2.0).round() as usize
}

/// Most frequent value of `data`; ties go to the smallest value
///
/// # Errors
///
/// Returns `InvalidInput` if `data` is empty
pub fn most_common(data: &[usize]) -> Result<usize> {
    if data.is_empty() {
        return Err(TranscriptionError::InvalidInput(
            "Cannot take the most common value of an empty sequence".to_string(),
        ));
    }
    let mut sorted = data.to_vec();
    sorted.sort_unstable();
    let mut best = (sorted[0], 0usize);
    let mut run = (sorted[0], 0usize);
    for &value in &sorted {
        if value == run.0 {
            run.1 += 1;
        } else {
            if run.1 > best.1 {
                best = run;
            }
            run = (value, 1);
        }
    }
    if run.1 > best.1 {
        best = run;
    }
    Ok(best.0)
}
