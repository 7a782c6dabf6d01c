//! Chroma extraction
//!
//! Folds short-time spectral energy into 12 pitch-class bins:
//! 1. Hann-windowed STFT over the span
//! 2. Each FFT bin is assigned to its nearest pitch class, ignoring octave
//! 3. Squared magnitudes are summed per class and averaged over frames

use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Number of pitch classes in a chroma vector
pub const PITCH_CLASSES: usize = 12;

/// Pitch class names, index 0 = C
pub const PITCH_CLASS_NAMES: [&str; PITCH_CLASSES] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Reference frequency for A4 (440 Hz)
const A4_FREQ: f32 = 440.0;

/// Lowest frequency folded into the chroma (A1)
const MIN_FREQ: f32 = 55.0;

/// Highest frequency folded into the chroma
const MAX_FREQ: f32 = 4000.0;

/// Octave-independent energy per pitch class
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Chroma(pub [f32; PITCH_CLASSES]);

impl Chroma {
    /// All-zero chroma (what silence produces)
    pub fn zeros() -> Self {
        Self([0.0; PITCH_CLASSES])
    }

    /// Energy per pitch class, index 0 = C
    pub fn values(&self) -> &[f32; PITCH_CLASSES] {
        &self.0
    }

    /// Energy of one pitch class (wraps modulo 12)
    pub fn energy(&self, pitch_class: usize) -> f32 {
        self.0[pitch_class % PITCH_CLASSES]
    }

    /// Sum over all pitch classes
    pub fn total(&self) -> f32 {
        self.0.iter().sum()
    }

    /// True when no bin holds NaN or infinity
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

/// Hann window of the given length
pub(crate) fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / len as f32).cos()))
        .collect()
}

/// Nearest pitch class (0 = C) of a frequency in Hz
pub fn pitch_class_of(freq: f32) -> u8 {
    let midi_note = 12.0 * (freq / A4_FREQ).log2() + 69.0;
    (midi_note.round() as i32).rem_euclid(12) as u8
}

/// STFT-based chroma extractor
pub struct ChromaExtractor {
    fft_size: usize,
    hop_size: usize,
    fft: Arc<dyn rustfft::Fft<f32>>,
    window: Vec<f32>,
    /// Pre-computed bin-to-pitch-class mapping (None = outside the musical range)
    bin_to_pitch_class: Vec<Option<u8>>,
    /// Reused per frame
    fft_buffer: Vec<Complex<f32>>,
}

impl ChromaExtractor {
    /// Create an extractor with a 4096-sample FFT and 50% overlap
    pub fn new(sample_rate: u32) -> Self {
        Self::with_frame(sample_rate, 4096, 2048)
    }

    /// Create an extractor with explicit FFT and hop sizes
    pub fn with_frame(sample_rate: u32, fft_size: usize, hop_size: usize) -> Self {
        let fft_size = fft_size.max(2);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Self {
            fft_size,
            hop_size: hop_size.max(1),
            fft,
            window: hann_window(fft_size),
            bin_to_pitch_class: Self::compute_pitch_class_mapping(fft_size, sample_rate),
            fft_buffer: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    /// Map each positive-frequency bin to its nearest pitch class
    fn compute_pitch_class_mapping(fft_size: usize, sample_rate: u32) -> Vec<Option<u8>> {
        let nyquist = sample_rate as f32 / 2.0;
        let bin_width = sample_rate as f32 / fft_size as f32;

        (0..fft_size / 2)
            .map(|bin| {
                let freq = bin as f32 * bin_width;
                if freq < MIN_FREQ || freq > MAX_FREQ || freq >= nyquist {
                    None
                } else {
                    Some(pitch_class_of(freq))
                }
            })
            .collect()
    }

    /// Compute the frame-averaged chroma of a span of mono samples
    ///
    /// Spans shorter than one FFT are zero-padded into a single frame.
    pub fn extract(&mut self, samples: &[f32]) -> Chroma {
        let mut chroma = [0.0f32; PITCH_CLASSES];
        if samples.is_empty() {
            return Chroma(chroma);
        }

        let mut frame_count = 0usize;
        if samples.len() < self.fft_size {
            self.accumulate_frame(samples, &mut chroma);
            frame_count = 1;
        } else {
            let mut pos = 0;
            while pos + self.fft_size <= samples.len() {
                self.accumulate_frame(&samples[pos..pos + self.fft_size], &mut chroma);
                frame_count += 1;
                pos += self.hop_size;
            }
        }

        for v in &mut chroma {
            *v /= frame_count as f32;
        }

        Chroma(chroma)
    }

    /// Add one frame's pitch-class energy into `chroma`
    fn accumulate_frame(&mut self, frame: &[f32], chroma: &mut [f32; PITCH_CLASSES]) {
        let filled = frame.len().min(self.fft_size);
        for (slot, (s, w)) in self
            .fft_buffer
            .iter_mut()
            .zip(frame.iter().zip(&self.window))
        {
            *slot = Complex::new(s * w, 0.0);
        }
        for slot in self.fft_buffer.iter_mut().skip(filled) {
            *slot = Complex::new(0.0, 0.0);
        }

        self.fft.process(&mut self.fft_buffer);

        for (complex, pitch_class) in self.fft_buffer[..self.fft_size / 2]
            .iter()
            .zip(&self.bin_to_pitch_class)
        {
            if let Some(pc) = pitch_class {
                chroma[*pc as usize] += complex.norm_sqr();
            }
        }
    }
}
