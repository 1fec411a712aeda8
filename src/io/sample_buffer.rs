//! Sample windowing and buffering utilities

/// Buffer producing fixed-length windows at a fixed (possibly fractional) hop
///
/// Window `k` starts at sample `round(k * hop_samples)`. Only full windows
/// are produced.
#[derive(Debug)]
pub struct SampleBuffer {
    /// Buffer data
    data: Vec<f32>,
    /// Index of the next window
    position: usize,
    /// Window length in samples
    window_size: usize,
    /// Hop between window starts, in samples
    hop_samples: f64,
}

impl SampleBuffer {
    /// Create a buffer over `data`
    pub fn new(data: Vec<f32>, window_size: usize, hop_samples: f64) -> Self {
        Self {
            data,
            position: 0,
            window_size,
            hop_samples,
        }
    }

    /// Number of full windows the buffer will produce
    pub fn window_count(&self) -> usize {
        if self.window_size == 0 || self.window_size > self.data.len() || !(self.hop_samples > 0.0) {
            return 0;
        }
        let last_start = self.data.len() - self.window_size;
        let mut count = 0;
        while self.start_of(count) <= last_start {
            count += 1;
        }
        count
    }

    fn start_of(&self, index: usize) -> usize {
        (index as f64 * self.hop_samples).round() as usize
    }

    /// Get next window of samples
    pub fn next_window(&mut self) -> Option<Vec<f32>> {
        if self.window_size == 0 || !(self.hop_samples > 0.0) {
            return None;
        }
        let start = self.start_of(self.position);
        if start + self.window_size > self.data.len() {
            return None;
        }
        self.position += 1;
        Some(self.data[start..start + self.window_size].to_vec())
    }
}
