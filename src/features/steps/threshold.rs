//! Activation state machines used for energy masking
//!
//! Both thresholds map a signal to a boolean activation per sample. With
//! `mode_mask` the output is inverted, so that `true` marks the samples to
//! exclude.

use crate::error::{Result, TranscriptionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    Below,
    Between,
    Above,
}

/// Two-threshold activation with memory
///
/// Samples above `activation` are active, samples at or below `deactivation`
/// (and NaN) are inactive. A run of samples in between takes the state that
/// held before the run. With quick activation (deactivation), a run that
/// ends by going above (below) takes that new state immediately. A leading
/// run counts as preceded by an inactive sample.
#[derive(Debug, Clone)]
pub struct HysteresisThreshold {
    deactivation: f64,
    activation: f64,
    mode_mask: bool,
    quick_activation: bool,
    quick_deactivation: bool,
}

impl HysteresisThreshold {
    /// Build the state machine
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `activation <= deactivation`
    pub fn new(
        deactivation: f64,
        activation: f64,
        mode_mask: bool,
        quick_activation: bool,
        quick_deactivation: bool,
    ) -> Result<Self> {
        if !(activation > deactivation) {
            return Err(TranscriptionError::InvalidInput(format!(
                "Activation threshold {} must be above deactivation threshold {}",
                activation, deactivation
            )));
        }
        Ok(Self {
            deactivation,
            activation,
            mode_mask,
            quick_activation,
            quick_deactivation,
        })
    }

    fn zone(&self, value: f64) -> Zone {
        if value.is_nan() || value <= self.deactivation {
            Zone::Below
        } else if value > self.activation {
            Zone::Above
        } else {
            Zone::Between
        }
    }

    /// Activation (or mask, in mask mode) of every sample
    pub fn perform(&self, signal: &[f64]) -> Vec<bool> {
        let active = !self.mode_mask;
        let inactive = self.mode_mask;
        let mut result = vec![inactive; signal.len()];

        let mut previous = Zone::Below;
        let mut run_start = 0;
        let mut before_run = Zone::Below;

        for (k, &value) in signal.iter().enumerate() {
            let zone = self.zone(value);
            match zone {
                Zone::Below => {
                    result[k] = inactive;
                    if previous == Zone::Between {
                        let state = if before_run == Zone::Below || self.quick_deactivation {
                            inactive
                        } else {
                            active
                        };
                        result[run_start..k].fill(state);
                    }
                }
                Zone::Between => {
                    if previous != Zone::Between {
                        run_start = k;
                        before_run = previous;
                    }
                }
                Zone::Above => {
                    result[k] = active;
                    if previous == Zone::Between {
                        let state = if before_run == Zone::Above || self.quick_activation {
                            active
                        } else {
                            inactive
                        };
                        result[run_start..k].fill(state);
                    }
                }
            }
            previous = zone;
        }

        if previous == Zone::Between {
            let state = if before_run == Zone::Above { active } else { inactive };
            result[run_start..].fill(state);
        }
        result
    }
}

/// Activation of runs with enough accumulated value
///
/// A run of samples `>= threshold_min` is active only if the sum of its
/// values exceeds `cumsum_min`. NaN samples end a run.
#[derive(Debug, Clone)]
pub struct CumulativeSumThreshold {
    threshold_min: f64,
    cumsum_min: f64,
    mode_mask: bool,
}

impl CumulativeSumThreshold {
    /// Build the state machine
    pub fn new(threshold_min: f64, cumsum_min: f64, mode_mask: bool) -> Self {
        Self {
            threshold_min,
            cumsum_min,
            mode_mask,
        }
    }

    /// Activation (or mask, in mask mode) of every sample
    pub fn perform(&self, signal: &[f64]) -> Vec<bool> {
        let active = !self.mode_mask;
        let mut result = vec![self.mode_mask; signal.len()];

        let mut run_start = 0;
        let mut cumsum = 0.0;
        let mut in_run = false;
        for (k, &value) in signal.iter().enumerate() {
            if value >= self.threshold_min {
                if !in_run {
                    run_start = k;
                    cumsum = 0.0;
                    in_run = true;
                }
                cumsum += value;
            } else if in_run {
                if cumsum > self.cumsum_min {
                    result[run_start..k].fill(active);
                }
                in_run = false;
            }
        }
        if in_run && cumsum > self.cumsum_min {
            result[run_start..].fill(active);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAN: f64 = f64::NAN;

    fn hysteresis(mask: bool, quick_on: bool, quick_off: bool) -> HysteresisThreshold {
        HysteresisThreshold::new(5.0, 10.0, mask, quick_on, quick_off).unwrap()
    }

    #[test]
    fn test_hysteresis_rejects_inverted_thresholds() {
        assert!(HysteresisThreshold::new(10.0, 5.0, false, false, false).is_err());
        assert!(HysteresisThreshold::new(5.0, 5.0, false, false, false).is_err());
    }

    #[test]
    fn test_hysteresis_activation() {
        let signal = [1.0, 1.5, 2.0, 3.0, 4.5, 6.0, 7.0, 11.0, 10.5, 13.0];
        let expected = [false, false, false, false, false, false, false, true, true, true];
        assert_eq!(hysteresis(false, false, false).perform(&signal), expected);
        let quick = [false, false, false, false, false, true, true, true, true, true];
        assert_eq!(hysteresis(false, true, false).perform(&signal), quick);
    }

    #[test]
    fn test_hysteresis_deactivation() {
        let signal = [14.0, 15.4, 8.0, 5.5, 9.5, 4.0, 1.0, 2.0, 1.5, 4.0];
        let expected = [true, true, true, true, true, false, false, false, false, false];
        assert_eq!(hysteresis(false, false, false).perform(&signal), expected);
        let quick = [true, true, false, false, false, false, false, false, false, false];
        assert_eq!(hysteresis(false, false, true).perform(&signal), quick);
    }

    #[test]
    fn test_hysteresis_not_enough() {
        let low = [1.0, 1.5, 2.0, 3.0, 4.5, 6.0, 7.0, 8.0, 4.0, 3.0];
        assert!(hysteresis(false, false, false).perform(&low).iter().all(|&a| !a));
        let high = [11.0, 11.5, 12.0, 13.0, 6.5, 6.0, 7.0, 11.0, 10.5, 13.0];
        assert!(hysteresis(false, false, false).perform(&high).iter().all(|&a| a));
    }

    #[test]
    fn test_hysteresis_single_samples() {
        let signal = [11.0, 11.5, 12.0, 13.0, 16.5, 1.0, 17.0, 11.0, 10.5, 13.0];
        let mask = hysteresis(true, false, false).perform(&signal);
        assert_eq!(mask, [false, false, false, false, false, true, false, false, false, false]);
        let signal = [4.0, 1.4, 4.0, 3.5, 19.5, 4.0, 1.0, 2.0, 1.5, 4.0];
        let active = hysteresis(false, false, false).perform(&signal);
        assert_eq!(active, [false, false, false, false, true, false, false, false, false, false]);
    }

    #[test]
    fn test_hysteresis_leading_and_trailing_runs() {
        let rising = [6.0, 6.5, 5.1, 13.0, 14.5, 11.0, 17.0, 14.0, 13.5, 13.0];
        let expected = [false, false, false, true, true, true, true, true, true, true];
        assert_eq!(hysteresis(false, false, false).perform(&rising), expected);
        assert!(hysteresis(false, true, false).perform(&rising).iter().all(|&a| a));

        let falling_tail = [11.0, 11.5, 12.0, 13.0, 14.5, 6.0, 7.0, 8.0, 9.0, 8.0];
        assert!(hysteresis(false, false, false).perform(&falling_tail).iter().all(|&a| a));
        let only_between = [7.0, 6.5, 6.0, 7.0, 9.5, 6.0, 7.0, 9.0, 5.6, 8.0];
        assert!(hysteresis(false, true, false).perform(&only_between).iter().all(|&a| !a));
    }

    #[test]
    fn test_hysteresis_nan_is_below() {
        // NaN breaks an in-between run like a low sample
        let signal = [11.0, 7.0, NAN, 7.0, 11.0];
        assert_eq!(
            hysteresis(false, false, false).perform(&signal),
            [true, true, false, false, true]
        );
        let signal = [NAN, 11.5, NAN, 13.0];
        assert_eq!(hysteresis(false, false, false).perform(&signal), [false, true, false, true]);
        let signal = [12.0, NAN, NAN];
        assert_eq!(hysteresis(false, true, true).perform(&signal), [true, false, false]);
    }

    #[test]
    fn test_hysteresis_mask_is_complement() {
        let signal = [14.0, 15.4, 8.0, 5.5, 9.5, 4.0, 1.0, 2.0, 1.5, 4.0, 7.0, 12.0];
        let active = hysteresis(false, true, false).perform(&signal);
        let mask = hysteresis(true, true, false).perform(&signal);
        assert!(active.iter().zip(&mask).all(|(a, m)| a != m));
    }

    #[test]
    fn test_hysteresis_binary_input_is_fixed_point() {
        let binary = [0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0];
        let threshold = HysteresisThreshold::new(0.25, 0.75, false, false, false).unwrap();
        let once: Vec<f64> = threshold
            .perform(&binary)
            .iter()
            .map(|&a| if a { 1.0 } else { 0.0 })
            .collect();
        assert_eq!(once, binary);
    }

    #[test]
    fn test_cumsum_activation() {
        let threshold = CumulativeSumThreshold::new(1.0, 3.0, false);
        let signal = [0.5, 0.5, 0.3, 0.2, 1.5, 1.1, 1.1, 2.0, 0.8, 0.7];
        let expected = [false, false, false, false, true, true, true, true, false, false];
        assert_eq!(threshold.perform(&signal), expected);

        let mask = CumulativeSumThreshold::new(1.0, 3.0, true).perform(&signal);
        assert!(mask.iter().zip(&expected).all(|(m, a)| m != a));
    }

    #[test]
    fn test_cumsum_not_reached() {
        let threshold = CumulativeSumThreshold::new(1.0, 3.0, false);
        let signal = [0.5, 0.5, 0.3, 0.2, 1.5, 1.1, 0.8, 2.0, 0.8, 0.7];
        assert!(threshold.perform(&signal).iter().all(|&a| !a));
    }

    #[test]
    fn test_cumsum_runs_at_borders() {
        let threshold = CumulativeSumThreshold::new(1.0, 3.0, false);
        let signal = [1.5, 1.5, 1.3, 0.2, 2.0, 2.1, 0.8, 2.0, 0.8, 0.7];
        let expected = [true, true, true, false, true, true, false, false, false, false];
        assert_eq!(threshold.perform(&signal), expected);

        let signal = [4.5, 0.5, 0.3, 0.2, 5.0, 0.85, 0.8, 0.9, 0.8, 6.7];
        let expected = [true, false, false, false, true, false, false, false, false, true];
        assert_eq!(threshold.perform(&signal), expected);

        let signal = [0.5, 5.5, 5.3, 4.2, 4.0, 3.85, 2.8, 6.9, 6.8, 6.7];
        let expected = [false, true, true, true, true, true, true, true, true, true];
        assert_eq!(threshold.perform(&signal), expected);
    }

    #[test]
    fn test_cumsum_short_signals() {
        let threshold = CumulativeSumThreshold::new(1.0, 3.0, false);
        assert!(threshold.perform(&[]).is_empty());
        assert_eq!(threshold.perform(&[15.0]), [true]);
        assert_eq!(threshold.perform(&[0.5]), [false]);
        assert_eq!(threshold.perform(&[2.5]), [false]);
        assert_eq!(threshold.perform(&[NAN, 4.0]), [false, true]);
    }
}
