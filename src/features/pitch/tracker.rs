//! Pitch track extraction from an audio source
//!
//! Windows are pulled sequentially from the source and dispatched to a
//! bounded rayon pool. Each task writes the pitch and energy of its window
//! into the slot matching the window index, so the track order does not
//! depend on completion order.

use super::{PitchEstimator, PitchTrack};
use crate::config::{ReaderConfig, DEFAULT_REFERENCE_PITCH_HZ};
use crate::error::{Result, TranscriptionError};
use crate::io::source::AudioSource;
use crate::progress::Progress;
use crate::signal::freq_to_tone;
use std::sync::mpsc;
use std::sync::Arc;

/// Pitch and energy of one window
#[derive(Debug, Clone, Copy)]
struct WindowResult {
    index: usize,
    pitch_st: f64,
    energy: f64,
}

/// Drives a [`PitchEstimator`] over successive windows of an [`AudioSource`]
///
/// # Example
///
/// ```no_run
/// use scorelisto::features::pitch::{McLeodPitch, PitchTrackBuilder};
/// use scorelisto::io::MemorySource;
/// use scorelisto::config::ReaderConfig;
/// use scorelisto::progress::Progress;
///
/// let mut source = MemorySource::from_mono(vec![0.0f32; 44100], 44100)?;
/// let builder = PitchTrackBuilder::new(McLeodPitch::default());
/// let track = builder.build(&mut source, &ReaderConfig::default(), &Progress::new())?;
/// println!("{} samples", track.len());
/// # Ok::<(), scorelisto::TranscriptionError>(())
/// ```
#[derive(Clone)]
pub struct PitchTrackBuilder {
    estimator: Arc<dyn PitchEstimator>,
    reference_pitch_hz: f64,
    threads: Option<usize>,
}

impl std::fmt::Debug for PitchTrackBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PitchTrackBuilder")
            .field("reference_pitch_hz", &self.reference_pitch_hz)
            .field("threads", &self.threads)
            .finish()
    }
}

impl PitchTrackBuilder {
    /// Builder using `estimator`, C1 as reference and one worker per core
    pub fn new<E: PitchEstimator + 'static>(estimator: E) -> Self {
        Self::with_estimator(Arc::new(estimator))
    }

    /// Builder sharing an existing estimator
    pub fn with_estimator(estimator: Arc<dyn PitchEstimator>) -> Self {
        Self {
            estimator,
            reference_pitch_hz: DEFAULT_REFERENCE_PITCH_HZ,
            threads: None,
        }
    }

    /// Frequency of the 0 semitone
    pub fn reference_pitch(mut self, reference_pitch_hz: f64) -> Self {
        self.reference_pitch_hz = reference_pitch_hz;
        self
    }

    /// Number of worker threads (default: available parallelism)
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads.max(1));
        self
    }

    /// Extract the pitch track of `source`
    ///
    /// # Arguments
    ///
    /// * `source` - Audio source, extraction is (re)initialized with `request`
    /// * `request` - Window size, period, resampling and crop
    /// * `progress` - Progress cell, advanced per completed window and polled
    ///   for cancellation after each dispatch
    ///
    /// # Returns
    ///
    /// One pitch/energy sample per window, offset by the crop start
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for invalid parameters or sources, and
    /// `Cancelled` if a cancellation is requested. In-flight windows are
    /// drained before returning.
    pub fn build(
        &self,
        source: &mut dyn AudioSource,
        request: &ReaderConfig,
        progress: &Progress,
    ) -> Result<PitchTrack> {
        if !(self.reference_pitch_hz > 0.0) {
            return Err(TranscriptionError::InvalidInput(format!(
                "Reference pitch must be positive, got {}",
                self.reference_pitch_hz
            )));
        }
        progress.report(0.0)?;
        source.init_extraction(request)?;
        let sample_rate_hz = source.output_sample_rate()? as f64;
        let duration_s = source.extraction_duration_s()?;

        let threads = self
            .threads
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));
        let max_in_flight = 2 * threads;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| TranscriptionError::InternalError(format!("Failed to build thread pool: {}", e)))?;

        log::debug!(
            "Extracting pitch track: {} Hz, period {} s, {:.3} s of audio, {} threads",
            sample_rate_hz,
            request.period_s,
            duration_s,
            threads
        );

        let (tx, rx) = mpsc::channel::<WindowResult>();
        let mut pitch_st: Vec<f64> = Vec::new();
        let mut energy: Vec<f64> = Vec::new();
        let mut in_flight = 0usize;

        // Progress counts completed windows and reaches 100 once all are stored
        let expected_windows = if duration_s > 0.0 { duration_s / request.period_s } else { 0.0 };
        let mut completed = 0usize;
        let mut store = |result: WindowResult, pitch_st: &mut Vec<f64>, energy: &mut Vec<f64>| {
            pitch_st[result.index] = result.pitch_st;
            energy[result.index] = result.energy;
            completed += 1;
            if expected_windows > 0.0 {
                progress.set((completed as f64 * 100.0 / expected_windows).min(99.0));
            }
        };

        while let Some(window) = source.next_buffer() {
            let index = pitch_st.len();
            pitch_st.push(f64::NAN);
            energy.push(f64::NAN);

            while in_flight >= max_in_flight {
                let result = receive(&rx)?;
                store(result, &mut pitch_st, &mut energy);
                in_flight -= 1;
            }

            let estimator = Arc::clone(&self.estimator);
            let tx = tx.clone();
            let reference = self.reference_pitch_hz;
            pool.spawn(move || {
                let frequency = estimator.estimate(&window, sample_rate_hz);
                let result = WindowResult {
                    index,
                    pitch_st: frequency.map_or(f64::NAN, |f| freq_to_tone(f, reference)),
                    energy: window_energy(&window),
                };
                // The receiver only disappears once the build returned
                let _ = tx.send(result);
            });
            in_flight += 1;

            if progress.is_cancelled() {
                log::debug!("Pitch extraction cancelled after {} windows", pitch_st.len());
                for _ in 0..in_flight {
                    receive(&rx)?;
                }
                return Err(TranscriptionError::Cancelled);
            }
        }

        for _ in 0..in_flight {
            let result = receive(&rx)?;
            store(result, &mut pitch_st, &mut energy);
        }
        progress.set(100.0);

        log::debug!("Pitch track extracted: {} samples", pitch_st.len());

        PitchTrack::new(
            request.period_s,
            self.reference_pitch_hz,
            request.time_start_s.unwrap_or(0.0).max(0.0),
            pitch_st,
            energy,
        )
    }
}

fn receive(rx: &mpsc::Receiver<WindowResult>) -> Result<WindowResult> {
    rx.recv()
        .map_err(|_| TranscriptionError::InternalError("Pitch worker terminated unexpectedly".to_string()))
}

/// Mean squared amplitude of a window
fn window_energy(window: &[f32]) -> f64 {
    if window.is_empty() {
        return f64::NAN;
    }
    window.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>() / window.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::pitch::McLeodPitch;
    use crate::io::MemorySource;

    fn tone(freq: f64, seconds: f64, sample_rate: u32, amplitude: f64) -> Vec<f32> {
        let n = (seconds * sample_rate as f64) as usize;
        (0..n)
            .map(|k| {
                (amplitude * (2.0 * std::f64::consts::PI * freq * k as f64 / sample_rate as f64).sin())
                    as f32
            })
            .collect()
    }

    #[test]
    fn test_track_of_a_tone() {
        let mut source = MemorySource::from_mono(tone(440.0, 0.2, 44100, 0.5), 44100).unwrap();
        let request = ReaderConfig {
            period_s: 0.005,
            ..ReaderConfig::default()
        };
        let progress = Progress::new();
        let track = PitchTrackBuilder::new(McLeodPitch::default())
            .threads(2)
            .build(&mut source, &request, &progress)
            .unwrap();

        // (0.2 - 0.02) / 0.005 + 1 windows
        assert_eq!(track.len(), 37);
        assert_eq!(track.energy.len(), track.len());
        assert_eq!(progress.value(), 100.0);
        for (&p, &e) in track.pitch_st.iter().zip(&track.energy) {
            assert!((p - 45.0).abs() < 0.1, "A4 is 45 st above C1, got {}", p);
            assert!((e - 0.125).abs() < 0.01, "Energy of a 0.5 sine is 0.125, got {}", e);
        }
    }

    #[test]
    fn test_silence_has_no_pitch() {
        let mut source = MemorySource::from_mono(vec![0.0; 4410], 44100).unwrap();
        let track = PitchTrackBuilder::new(McLeodPitch::default())
            .build(&mut source, &ReaderConfig::default(), &Progress::new())
            .unwrap();
        assert!(!track.is_empty());
        assert!(track.pitch_st.iter().all(|p| p.is_nan()));
        assert!(track.energy.iter().all(|&e| e == 0.0));
    }

    #[test]
    fn test_cancelled_extraction() {
        let mut source = MemorySource::from_mono(tone(220.0, 0.5, 44100, 0.5), 44100).unwrap();
        let progress = Progress::new();
        progress.cancel();
        let result = PitchTrackBuilder::new(McLeodPitch::default()).build(
            &mut source,
            &ReaderConfig::default(),
            &progress,
        );
        assert_eq!(result, Err(TranscriptionError::Cancelled));
    }

    #[test]
    fn test_offset_follows_crop() {
        let mut source = MemorySource::from_mono(tone(440.0, 0.3, 44100, 0.5), 44100).unwrap();
        let request = ReaderConfig {
            period_s: 0.01,
            time_start_s: Some(0.1),
            ..ReaderConfig::default()
        };
        let track = PitchTrackBuilder::new(McLeodPitch::default())
            .build(&mut source, &request, &Progress::new())
            .unwrap();
        assert!((track.offset_s - 0.1).abs() < 1e-12);
        assert_eq!(track.len(), 19);
    }

    struct ProgressRecorder {
        progress: Progress,
        seen: std::sync::Mutex<Vec<f64>>,
    }

    impl PitchEstimator for ProgressRecorder {
        fn estimate(&self, _window: &[f32], _sample_rate_hz: f64) -> Option<f64> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(self.progress.value());
            }
            Some(440.0)
        }
    }

    #[test]
    fn test_progress_follows_completed_windows() {
        let mut source = MemorySource::from_mono(tone(440.0, 0.2, 44100, 0.5), 44100).unwrap();
        let request = ReaderConfig {
            period_s: 0.005,
            ..ReaderConfig::default()
        };
        let progress = Progress::new();
        let recorder = Arc::new(ProgressRecorder {
            progress: progress.clone(),
            seen: std::sync::Mutex::new(Vec::new()),
        });
        let track = PitchTrackBuilder::with_estimator(recorder.clone())
            .threads(2)
            .build(&mut source, &request, &progress)
            .unwrap();

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), track.len());
        assert!(seen.iter().all(|&value| value < 100.0), "Progress ran ahead: {:?}", seen);
        assert_eq!(progress.value(), 100.0);
    }
}
