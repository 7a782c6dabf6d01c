//! Tempo estimation from onset periodicity
//!
//! 1. Spectral flux onset envelope (half-wave rectified magnitude increase)
//! 2. Mean-removed autocorrelation of the envelope over the 30-300 BPM lag range
//! 3. Log-normal tempo prior around 120 BPM picks among peaks
//! 4. Parabolic interpolation refines the winning lag
//! 5. Slow readings are doubled when the half lag is about as periodic

use crate::chroma::hann_window;
use rustfft::{num_complex::Complex, FftPlanner};
use std::sync::Arc;
use tracing::debug;

/// Slowest tempo considered
pub const MIN_BPM: f32 = 30.0;

/// Fastest tempo considered
pub const MAX_BPM: f32 = 300.0;

/// Centre of the tempo prior
const PRIOR_CENTER_BPM: f32 = 120.0;

/// Standard deviation of the tempo prior, in octaves
const PRIOR_OCTAVES: f32 = 1.0;

/// Normalized autocorrelation below this is treated as "no periodicity"
pub const PERIODICITY_FLOOR: f32 = 0.1;

/// Readings in this range may be half the real tempo
const OCTAVE_CHECK_MIN_BPM: f32 = 65.0;
const OCTAVE_CHECK_MAX_BPM: f32 = 95.0;

/// A doubled reading must land in this range
const DOUBLED_MIN_BPM: f32 = 120.0;
const DOUBLED_MAX_BPM: f32 = 180.0;

/// Half-lag autocorrelation needed, relative to the chosen lag, to double
const DOUBLING_RATIO: f32 = 0.7;

/// Tempo estimator using spectral flux onset detection
pub struct TempoEstimator {
    sample_rate: u32,
    fft_size: usize,
    hop_size: usize,
    fft: Arc<dyn rustfft::Fft<f32>>,
    window: Vec<f32>,
}

impl TempoEstimator {
    /// Create a tempo estimator (2048-sample frames, 512-sample hop)
    pub fn new(sample_rate: u32) -> Self {
        let fft_size = 2048;
        let hop_size = 512;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Self {
            sample_rate,
            fft_size,
            hop_size,
            fft,
            window: hann_window(fft_size),
        }
    }

    /// Onset envelope frames per second
    pub fn frame_rate(&self) -> f32 {
        self.sample_rate as f32 / self.hop_size as f32
    }

    /// Estimate the dominant tempo in BPM, or 0.0 when nothing periodic is found
    pub fn estimate(&self, samples: &[f32]) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }

        let envelope = self.onset_envelope(samples);
        let peak = envelope.iter().copied().fold(0.0f32, f32::max);
        if !(peak > 0.0) || !peak.is_finite() {
            debug!("Flat onset envelope, no tempo");
            return 0.0;
        }

        let fps = self.frame_rate();
        let min_lag = ((fps * 60.0 / MAX_BPM).floor() as usize).max(1);
        let max_lag = ((fps * 60.0 / MIN_BPM).ceil() as usize).min(envelope.len() / 2);
        if min_lag + 1 >= max_lag {
            debug!(
                "Onset envelope too short for tempo ({} frames)",
                envelope.len()
            );
            return 0.0;
        }

        let Some(acf) = autocorrelation(&envelope, max_lag) else {
            return 0.0;
        };

        let mut best: Option<(usize, f32)> = None;
        for lag in min_lag..max_lag {
            let value = acf[lag];
            if value <= 0.0 || value < acf[lag - 1] || value < acf[lag + 1] {
                continue;
            }
            let weighted = value * tempo_prior(60.0 * fps / lag as f32);
            if best.map_or(true, |(_, w)| weighted > w) {
                best = Some((lag, weighted));
            }
        }

        let Some((lag, _)) = best else {
            return 0.0;
        };
        if acf[lag] < PERIODICITY_FLOOR {
            debug!("Weak periodicity ({:.3}), no tempo", acf[lag]);
            return 0.0;
        }

        let refined = lag as f32 + parabolic_offset(acf[lag - 1], acf[lag], acf[lag + 1]);
        let bpm = resolve_octave(&acf, lag, refined, 60.0 * fps / refined).clamp(0.0, MAX_BPM);
        debug!("Tempo lag {:.2} frames -> {:.2} BPM (acf {:.3})", refined, bpm, acf[lag]);
        bpm
    }

    /// Spectral flux per hop, normalized to a peak of 1.0
    pub fn onset_envelope(&self, samples: &[f32]) -> Vec<f32> {
        let mut envelope = Vec::new();
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.fft_size];
        let mut prev_spectrum: Option<Vec<f32>> = None;

        let mut frame_start = 0;
        while frame_start + self.fft_size <= samples.len() {
            let frame = &samples[frame_start..frame_start + self.fft_size];
            for (slot, (s, w)) in buffer.iter_mut().zip(frame.iter().zip(&self.window)) {
                *slot = Complex::new(s * w, 0.0);
            }

            self.fft.process(&mut buffer);

            let spectrum: Vec<f32> = buffer[..self.fft_size / 2].iter().map(|c| c.norm()).collect();

            // Only increases in magnitude indicate onsets
            if let Some(ref prev) = prev_spectrum {
                let flux: f32 = spectrum
                    .iter()
                    .zip(prev.iter())
                    .map(|(curr, prev)| (curr - prev).max(0.0))
                    .sum();
                envelope.push(flux);
            }

            prev_spectrum = Some(spectrum);
            frame_start += self.hop_size;
        }

        let max = envelope.iter().copied().fold(0.0f32, f32::max);
        if max > 0.0 {
            for v in &mut envelope {
                *v /= max;
            }
        }

        envelope
    }
}

/// Mean-removed autocorrelation for lags `0..=max_lag`, normalized so lag 0 is 1.0
fn autocorrelation(envelope: &[f32], max_lag: usize) -> Option<Vec<f32>> {
    let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
    let centered: Vec<f32> = envelope.iter().map(|v| v - mean).collect();
    let energy: f32 = centered.iter().map(|v| v * v).sum();
    if !(energy > 0.0) {
        return None;
    }

    Some(
        (0..=max_lag)
            .map(|lag| {
                centered
                    .iter()
                    .zip(&centered[lag..])
                    .map(|(a, b)| a * b)
                    .sum::<f32>()
                    / energy
            })
            .collect(),
    )
}

/// Double a slow reading when the envelope repeats about as strongly at half the lag
///
/// The prior alone cannot separate e.g. 87 and 174 BPM, which sit almost
/// symmetrically around its centre.
fn resolve_octave(acf: &[f32], lag: usize, refined: f32, bpm: f32) -> f32 {
    let doubled = bpm * 2.0;
    if !(OCTAVE_CHECK_MIN_BPM..=OCTAVE_CHECK_MAX_BPM).contains(&bpm)
        || !(DOUBLED_MIN_BPM..=DOUBLED_MAX_BPM).contains(&doubled)
    {
        return bpm;
    }

    let half = (refined / 2.0).round() as usize;
    if half < 2 || half + 1 >= acf.len() {
        return bpm;
    }
    let support = acf[half - 1..=half + 1]
        .iter()
        .copied()
        .fold(f32::MIN, f32::max);

    if support >= DOUBLING_RATIO * acf[lag] {
        debug!(
            "Half lag holds {:.3} of {:.3}, doubling {:.2} BPM",
            support, acf[lag], bpm
        );
        doubled
    } else {
        bpm
    }
}

/// Log-normal weight favouring tempos near 120 BPM
fn tempo_prior(bpm: f32) -> f32 {
    let octaves = (bpm / PRIOR_CENTER_BPM).log2() / PRIOR_OCTAVES;
    (-0.5 * octaves * octaves).exp()
}

/// Sub-lag offset of the vertex of the parabola through three points
fn parabolic_offset(left: f32, centre: f32, right: f32) -> f32 {
    let denom = left - 2.0 * centre + right;
    if denom.abs() < f32::EPSILON {
        return 0.0;
    }
    (0.5 * (left - right) / denom).clamp(-0.5, 0.5)
}
