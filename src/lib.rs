//! # Scorelisto
//!
//! Monophonic audio-to-score transcription: a recording of a single voice or
//! instrument becomes a notated score with key signature, meter, spelled
//! pitches and quantized rhythm.
//!
//! ## Features
//!
//! - **Pitch tracking**: McLeod normalized square difference estimator over
//!   overlapping windows, computed on a bounded worker pool
//! - **Note segmentation**: energy and range masking, voiced group detection
//!   and histogram-based step recovery
//! - **Key estimation**: tuning offset, key signature, clef and mode
//! - **Rhythm quantization**: shortest-path search over catalog combinations
//!   of 1 to 4 notes, measure layout and notation with ties and beams
//!
//! ## Quick Start
//!
//! ```no_run
//! use scorelisto::{transcribe_samples, TranscriptionConfig};
//!
//! // Mono samples in [-1.0, 1.0]
//! let samples: Vec<f32> = vec![];
//! let result = transcribe_samples(&samples, 44100, &TranscriptionConfig::default())?;
//!
//! let score = &result.score;
//! println!("Key: {} in {}/{}", result.metadata.key_name, score.beats, score.beat_type);
//! for note in &score.notes {
//!     match note.pitch {
//!         Some(pitch) => println!("{} ({} ticks)", pitch.name(), note.rhythm.duration),
//!         None => println!("rest ({} ticks)", note.rhythm.duration),
//!     }
//! }
//! # Ok::<(), scorelisto::TranscriptionError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! AudioSource → PitchTrackBuilder → StepSegmenter → ScoreBuilder (KeyEstimator + RhythmQuantizer) → Score
//! ```
//!
//! Every stage takes a [`Progress`] handle for percent reporting and
//! cooperative cancellation, and each stage output can be persisted with
//! [`io::records`] to resume a run later.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod preprocessing;
pub mod progress;
pub mod signal;

// Re-export main types
pub use analysis::metadata::TranscriptionMetadata;
pub use analysis::result::TranscriptionResult;
pub use analysis::{Score, ScoreBuilder, ScoreNote};
pub use config::TranscriptionConfig;
pub use error::TranscriptionError;
pub use progress::Progress;

use error::Result;
use features::pitch::{McLeodPitch, PitchTrack, PitchTrackBuilder};
use features::steps::{HistogramSegmentation, NoteSequence, StepSegmenter};
use io::{AudioSource, MemorySource};

/// Transcribe mono samples into a score
///
/// # Arguments
///
/// * `samples` - Mono audio samples, normalized to [-1.0, 1.0]
/// * `sample_rate_hz` - Sample rate in Hz
/// * `config` - Pipeline configuration
///
/// # Errors
///
/// Returns `InvalidInput` for empty samples or an invalid configuration,
/// `Infeasible` when no note or no rhythm can be found
///
/// # Example
///
/// ```no_run
/// use scorelisto::{transcribe_samples, TranscriptionConfig};
///
/// let samples = vec![0.0f32; 44100 * 3];
/// let result = transcribe_samples(&samples, 44100, &TranscriptionConfig::default())?;
/// # Ok::<(), scorelisto::TranscriptionError>(())
/// ```
pub fn transcribe_samples(
    samples: &[f32],
    sample_rate_hz: u32,
    config: &TranscriptionConfig,
) -> Result<TranscriptionResult> {
    if samples.is_empty() {
        return Err(TranscriptionError::InvalidInput("Empty audio samples".to_string()));
    }
    let mut source = MemorySource::from_mono(samples.to_vec(), sample_rate_hz)?;
    transcribe_source(&mut source, config, &Progress::new())
}

/// Run the full pipeline over an audio source
///
/// `progress` is shared by the stages in turn: it climbs from 0 to 100
/// during pitch tracking, again during segmentation, then during score
/// assembly. A cancellation requested at any point stops the current stage.
///
/// # Errors
///
/// Propagates the error of the first failing stage
pub fn transcribe_source(
    source: &mut dyn AudioSource,
    config: &TranscriptionConfig,
    progress: &Progress,
) -> Result<TranscriptionResult> {
    use std::time::Instant;
    let start_time = Instant::now();
    config.validate()?;
    log::debug!(
        "Starting transcription: window {} s, period {} s, stream {}",
        config.reader.window_s,
        config.reader.period_s,
        config.reader.stream_index
    );

    let pitch_track = PitchTrackBuilder::new(McLeodPitch::new(config.mcleod.clone()))
        .reference_pitch(config.reference_pitch_hz)
        .build(source, &config.reader, progress)?;
    let sample_rate_hz = source.output_sample_rate()?;

    let steps = segment_track(&pitch_track, config, progress)?;
    let (score, key_name) = score_steps(&steps, config, progress)?;

    let mut warnings = Vec::new();
    if score.pitched_notes().next().is_none() {
        warnings.push("Score holds no pitched note".to_string());
    }
    let metadata = TranscriptionMetadata {
        duration_s: pitch_track.duration_s(),
        sample_rate_hz,
        processing_time_ms: start_time.elapsed().as_secs_f64() * 1000.0,
        segment_count: steps.notes.len(),
        key_name,
        warnings,
        ..TranscriptionMetadata::default()
    };
    log::debug!(
        "Transcription done in {:.1} ms: {} segments, {} score entries",
        metadata.processing_time_ms,
        metadata.segment_count,
        score.notes.len()
    );
    Ok(TranscriptionResult {
        pitch_track,
        steps,
        score,
        metadata,
    })
}

/// Segment a pitch track into notes and rests with the histogram strategy
///
/// # Errors
///
/// See [`StepSegmenter::perform`]
pub fn segment_track(
    track: &PitchTrack,
    config: &TranscriptionConfig,
    progress: &Progress,
) -> Result<NoteSequence> {
    let strategy = HistogramSegmentation::new(&config.histogram)?;
    let mut segmenter = StepSegmenter::new(track, Box::new(strategy))?;
    segmenter.perform(&config.steps, progress)
}

/// Build the score of a note sequence, with the name of its fitted key
///
/// # Errors
///
/// See [`ScoreBuilder::fit`] and [`ScoreBuilder::perform`]
pub fn score_steps(
    steps: &NoteSequence,
    config: &TranscriptionConfig,
    progress: &Progress,
) -> Result<(Score, String)> {
    let mut builder = ScoreBuilder::new(config.score.clone());
    builder.fit(steps)?;
    let score = builder.perform(&config.rhythm, progress)?;
    Ok((score, builder.key().name()))
}
