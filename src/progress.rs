//! Shared progress and cancellation cell
//!
//! Every pipeline stage receives a [`Progress`] handle. The stage writes its
//! percent-complete into it; the caller keeps a clone and may request a
//! cooperative cancellation at any time with [`Progress::cancel`]. The stage
//! polls [`Progress::checkpoint`] at phase boundaries and inside its outer
//! loops, unwinding with [`TranscriptionError::Cancelled`] once a request is seen.
//!
//! The cell stores one `f64`: values `>= 0` are percentages, a negative value
//! is a pending cancellation request.

use crate::error::{Result, TranscriptionError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const CANCEL_REQUEST: f64 = -1.0;

/// Cloneable handle over a single progress/cancellation value
#[derive(Debug, Clone)]
pub struct Progress {
    cell: Arc<AtomicU64>,
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress {
    /// Create a fresh cell at 0%
    pub fn new() -> Self {
        Self {
            cell: Arc::new(AtomicU64::new(0.0f64.to_bits())),
        }
    }

    /// Current raw value (negative while a cancellation is pending)
    pub fn value(&self) -> f64 {
        f64::from_bits(self.cell.load(Ordering::Acquire))
    }

    /// Report progress in percent, clamped to `[0, 100]`
    ///
    /// A pending cancellation request is never overwritten.
    pub fn set(&self, percent: f64) {
        let clamped = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };
        let _ = self
            .cell
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                if f64::from_bits(bits) < 0.0 {
                    None
                } else {
                    Some(clamped.to_bits())
                }
            });
    }

    /// Request a cooperative cancellation
    pub fn cancel(&self) {
        self.cell.store(CANCEL_REQUEST.to_bits(), Ordering::Release);
    }

    /// True once [`Progress::cancel`] has been called
    pub fn is_cancelled(&self) -> bool {
        self.value() < 0.0
    }

    /// Fail with `Cancelled` if a cancellation request is pending
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            log::debug!("Cancellation request observed");
            return Err(TranscriptionError::Cancelled);
        }
        Ok(())
    }

    /// Check for cancellation, then report `percent`
    pub fn report(&self, percent: f64) -> Result<()> {
        self.checkpoint()?;
        self.set(percent);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_clamps() {
        let progress = Progress::new();
        progress.set(150.0);
        assert_eq!(progress.value(), 100.0);
        progress.set(-3.0);
        assert_eq!(progress.value(), 0.0);
        assert!(!progress.is_cancelled());
    }

    #[test]
    fn test_cancel_is_sticky() {
        let progress = Progress::new();
        let caller = progress.clone();
        caller.cancel();
        progress.set(42.0);
        assert!(progress.is_cancelled(), "Writing progress must not clear a cancellation");
        assert_eq!(progress.checkpoint(), Err(TranscriptionError::Cancelled));
        assert!(progress.report(50.0).is_err());
    }
}
