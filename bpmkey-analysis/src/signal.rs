//! Decoded mono signal handed to the estimators

/// Mono samples at the source's native sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Signal {
    /// Wrap mono samples (normalized to -1.0..1.0)
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Mono samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when decoding produced no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds (0.0 for an invalid sample rate)
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Convert a time offset in seconds to a sample index, clamped to the signal length
    pub fn sample_index(&self, seconds: f64) -> usize {
        let index = (seconds * self.sample_rate as f64).round();
        if index <= 0.0 {
            0
        } else {
            (index as usize).min(self.samples.len())
        }
    }

    /// Samples in `[start, end)` seconds, clamped to the signal
    pub fn span(&self, start: f64, end: f64) -> &[f32] {
        let from = self.sample_index(start);
        let to = self.sample_index(end).max(from);
        &self.samples[from..to]
    }
}
