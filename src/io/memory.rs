//! In-memory audio source

use super::sample_buffer::SampleBuffer;
use super::source::{AudioSource, StreamInfo};
use crate::config::ReaderConfig;
use crate::error::{Result, TranscriptionError};
use crate::preprocessing::channel_mixer::{downmix, ChannelMixMode};
use crate::preprocessing::resample::resample_linear;

#[derive(Debug)]
struct MemoryStream {
    info: StreamInfo,
    samples: Vec<f32>,
}

#[derive(Debug)]
struct Extraction {
    buffer: SampleBuffer,
    sample_rate_hz: u32,
    duration_s: f64,
}

/// Audio source over decoded mono streams held in memory
///
/// # Example
///
/// ```no_run
/// use scorelisto::io::{AudioSource, MemorySource};
/// use scorelisto::config::ReaderConfig;
///
/// let samples = vec![0.0f32; 44100];
/// let mut source = MemorySource::from_mono(samples, 44100)?;
/// source.init_extraction(&ReaderConfig::default())?;
/// while let Some(window) = source.next_buffer() {
///     assert_eq!(window.len(), 882);
/// }
/// # Ok::<(), scorelisto::TranscriptionError>(())
/// ```
#[derive(Debug, Default)]
pub struct MemorySource {
    streams: Vec<MemoryStream>,
    extraction: Option<Extraction>,
}

impl MemorySource {
    /// Empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Source with a single mono stream
    pub fn from_mono(samples: Vec<f32>, sample_rate_hz: u32) -> Result<Self> {
        let mut source = Self::new();
        source.push_interleaved(&samples, 1, sample_rate_hz, "memory", ChannelMixMode::Average)?;
        Ok(source)
    }

    /// Append a stream of interleaved samples, down-mixed to mono
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the sample rate or the channel count is 0
    pub fn push_interleaved(
        &mut self,
        interleaved: &[f32],
        channels: usize,
        sample_rate_hz: u32,
        codec: &str,
        mode: ChannelMixMode,
    ) -> Result<()> {
        if sample_rate_hz == 0 {
            return Err(TranscriptionError::InvalidInput("Invalid sample rate: 0".to_string()));
        }
        let samples = downmix(interleaved, channels, mode)?;
        let info = StreamInfo {
            index: self.streams.len(),
            codec: codec.to_string(),
            channels,
            sample_rate_hz,
            frames: samples.len() as u64,
            duration_s: samples.len() as f64 / sample_rate_hz as f64,
            bit_rate: None,
        };
        self.streams.push(MemoryStream { info, samples });
        Ok(())
    }

    /// Mono samples of a stream at its native rate
    pub fn samples(&self, stream_index: usize) -> Option<&[f32]> {
        self.streams.get(stream_index).map(|s| s.samples.as_slice())
    }

    fn extraction(&self) -> Result<&Extraction> {
        self.extraction.as_ref().ok_or_else(|| {
            TranscriptionError::InvalidInput("Extraction has not been initialized".to_string())
        })
    }
}

impl AudioSource for MemorySource {
    fn streams(&self) -> Vec<StreamInfo> {
        self.streams.iter().map(|s| s.info.clone()).collect()
    }

    fn init_extraction(&mut self, request: &ReaderConfig) -> Result<()> {
        request.validate()?;
        let stream = self.streams.get(request.stream_index).ok_or_else(|| {
            TranscriptionError::InvalidInput(format!(
                "Stream {} does not exist ({} available)",
                request.stream_index,
                self.streams.len()
            ))
        })?;

        let native_rate = stream.info.sample_rate_hz;
        let rate = request.resample_rate_hz.unwrap_or(native_rate);
        let mut samples = resample_linear(&stream.samples, native_rate, rate)?;

        let to_index = |t: f64| ((t.max(0.0) * rate as f64).round() as usize).min(samples.len());
        let stop = request.time_stop_s.map(to_index).unwrap_or(samples.len());
        let start = request.time_start_s.map(to_index).unwrap_or(0).min(stop);
        samples.truncate(stop);
        samples.drain(..start);

        let window_size = ((request.window_s * rate as f64).round() as usize).max(1);
        let hop_samples = request.period_s * rate as f64;
        let duration_s = samples.len() as f64 / rate as f64;
        let buffer = SampleBuffer::new(samples, window_size, hop_samples);

        log::debug!(
            "Extraction ready on stream {}: {} Hz, window {} samples, hop {:.2} samples, {} windows",
            request.stream_index,
            rate,
            window_size,
            hop_samples,
            buffer.window_count()
        );

        self.extraction = Some(Extraction {
            buffer,
            sample_rate_hz: rate,
            duration_s,
        });
        Ok(())
    }

    fn output_sample_rate(&self) -> Result<u32> {
        Ok(self.extraction()?.sample_rate_hz)
    }

    fn extraction_duration_s(&self) -> Result<f64> {
        Ok(self.extraction()?.duration_s)
    }

    fn next_buffer(&mut self) -> Option<Vec<f32>> {
        self.extraction.as_mut().and_then(|e| e.buffer.next_window())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninitialized_source() {
        let mut source = MemorySource::from_mono(vec![0.0; 100], 1000).unwrap();
        assert!(source.output_sample_rate().is_err());
        assert!(source.next_buffer().is_none());
    }

    #[test]
    fn test_crop_and_frame() {
        let samples: Vec<f32> = (0..1000).map(|v| v as f32).collect();
        let mut source = MemorySource::from_mono(samples, 1000).unwrap();
        let request = ReaderConfig {
            window_s: 0.01,
            period_s: 0.005,
            time_start_s: Some(0.1),
            time_stop_s: Some(0.2),
            ..ReaderConfig::default()
        };
        source.init_extraction(&request).unwrap();
        assert_eq!(source.output_sample_rate().unwrap(), 1000);
        assert!((source.extraction_duration_s().unwrap() - 0.1).abs() < 1e-12);
        let first = source.next_buffer().unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first[0], 100.0);
        let mut count = 1;
        while source.next_buffer().is_some() {
            count += 1;
        }
        // starts 0, 5, ..., 90 within 100 cropped samples
        assert_eq!(count, 19);
    }

    #[test]
    fn test_resampled_extraction() {
        let mut source = MemorySource::from_mono(vec![0.25; 22050], 22050).unwrap();
        let request = ReaderConfig {
            resample_rate_hz: Some(44100),
            ..ReaderConfig::default()
        };
        source.init_extraction(&request).unwrap();
        assert_eq!(source.output_sample_rate().unwrap(), 44100);
        assert_eq!(source.next_buffer().map(|w| w.len()), Some(882));
    }

    #[test]
    fn test_missing_stream() {
        let mut source = MemorySource::from_mono(vec![0.0; 10], 1000).unwrap();
        let request = ReaderConfig {
            stream_index: 3,
            ..ReaderConfig::default()
        };
        assert!(source.init_extraction(&request).is_err());
        assert_eq!(source.streams().len(), 1);
    }
}
