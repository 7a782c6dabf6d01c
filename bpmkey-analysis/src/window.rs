//! Sliding-window key aggregation
//!
//! Estimates a key per window and keeps the label most windows agree on.

use crate::camelot::MusicalKey;
use crate::chroma::ChromaExtractor;
use crate::error::AnalysisError;
use crate::key::KeyEstimator;
use crate::signal::Signal;
use tracing::{debug, trace};

/// Window geometry for key aggregation, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregatorConfig {
    pub window_secs: f64,
    pub hop_secs: f64,
    /// Spans shorter than this are not scored
    pub min_window_secs: f64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            window_secs: 3.0,
            hop_secs: 1.0,
            min_window_secs: 0.5,
        }
    }
}

/// Most frequent key; ties go to the key that was voted for first
pub fn majority_vote(votes: &[MusicalKey]) -> Option<MusicalKey> {
    let mut tally: Vec<(MusicalKey, usize)> = Vec::new();
    for &vote in votes {
        match tally.iter_mut().find(|(key, _)| *key == vote) {
            Some((_, count)) => *count += 1,
            None => tally.push((vote, 1)),
        }
    }

    let mut winner: Option<(MusicalKey, usize)> = None;
    for (key, count) in tally {
        if winner.map_or(true, |(_, best)| count > best) {
            winner = Some((key, count));
        }
    }
    winner.map(|(key, _)| key)
}

/// Windowed key estimator for one signal's sample rate
pub struct WindowedKeyAggregator {
    config: AggregatorConfig,
    extractor: ChromaExtractor,
    estimator: KeyEstimator,
}

impl WindowedKeyAggregator {
    /// Aggregator with the default 3 s window and 1 s hop
    pub fn new(sample_rate: u32) -> Self {
        Self::with_config(sample_rate, AggregatorConfig::default())
    }

    pub fn with_config(sample_rate: u32, config: AggregatorConfig) -> Self {
        Self {
            config,
            extractor: ChromaExtractor::new(sample_rate),
            estimator: KeyEstimator::new(),
        }
    }

    /// Key estimate for every usable window, in time order
    pub fn window_estimates(&mut self, signal: &Signal) -> Result<Vec<MusicalKey>, AnalysisError> {
        let duration = signal.duration();
        let sample_rate = signal.sample_rate() as f64;
        let window = self.config.window_secs;
        let mut estimates = Vec::new();

        if window <= 0.0 || self.config.hop_secs <= 0.0 || sample_rate <= 0.0 {
            return Ok(estimates);
        }
        // Hops shorter than one sample would only repeat windows
        let hop = self.config.hop_secs.max(1.0 / sample_rate);

        let mut index = 0usize;
        loop {
            // Start times are derived from the index so they do not drift
            let start = index as f64 * hop;
            if start + window > duration + 1e-9 {
                break;
            }
            index += 1;

            let span = signal.span(start, start + window);
            if (span.len() as f64) < self.config.min_window_secs * sample_rate {
                trace!("Skipping short window at {:.1}s ({} samples)", start, span.len());
                continue;
            }

            let chroma = self.extractor.extract(span);
            let key = self.estimator.estimate(&chroma)?;
            trace!("Window {:.1}s-{:.1}s: {}", start, start + window, key);
            estimates.push(key);
        }

        Ok(estimates)
    }

    /// Dominant key of the whole signal
    ///
    /// Falls back to a single estimate over the entire signal when it is
    /// shorter than one window.
    pub fn dominant_key(&mut self, signal: &Signal) -> Result<MusicalKey, AnalysisError> {
        let estimates = self.window_estimates(signal)?;

        match majority_vote(&estimates) {
            Some(key) => {
                debug!("Key vote over {} windows: {}", estimates.len(), key);
                Ok(key)
            }
            None => {
                debug!(
                    "No full window in {:.2}s signal, estimating over whole signal",
                    signal.duration()
                );
                let chroma = self.extractor.extract(signal.samples());
                self.estimator.estimate(&chroma)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn tones(freqs: &[f32], sample_rate: u32, seconds: f32) -> Signal {
        let len = (sample_rate as f32 * seconds) as usize;
        let samples = (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                freqs.iter().map(|f| (2.0 * PI * f * t).sin()).sum::<f32>() / freqs.len() as f32
            })
            .collect();
        Signal::new(samples, sample_rate)
    }

    #[test]
    fn test_majority_vote() {
        use MusicalKey::*;
        assert_eq!(majority_vote(&[AMinor, CMajor, AMinor]), Some(AMinor));
        assert_eq!(majority_vote(&[]), None);
    }

    #[test]
    fn test_majority_vote_tie_goes_to_first_seen() {
        use MusicalKey::*;
        assert_eq!(majority_vote(&[GMajor, EMinor, EMinor, GMajor]), Some(GMajor));
        assert_eq!(majority_vote(&[EMinor, GMajor]), Some(EMinor));
    }

    #[test]
    fn test_window_count() {
        let signal = Signal::new(vec![0.0; 22050 * 10], 22050);
        let mut aggregator = WindowedKeyAggregator::new(22050);
        // Starts at 0..=7 s
        assert_eq!(aggregator.window_estimates(&signal).unwrap().len(), 8);
    }

    #[test]
    fn test_exact_fit_includes_last_window() {
        let signal = Signal::new(vec![0.0; 22050 * 3], 22050);
        let mut aggregator = WindowedKeyAggregator::new(22050);
        assert_eq!(aggregator.window_estimates(&signal).unwrap().len(), 1);
    }

    #[test]
    fn test_tiny_hop_is_clamped_to_one_sample() {
        let config = AggregatorConfig {
            window_secs: 0.99,
            hop_secs: 1e-12,
            min_window_secs: 0.5,
        };
        let signal = Signal::new(vec![0.0; 8000], 8000);
        let mut aggregator = WindowedKeyAggregator::with_config(8000, config);
        // Starts every 1/8000 s from 0 to 0.01 s
        assert_eq!(aggregator.window_estimates(&signal).unwrap().len(), 81);
    }

    #[test]
    fn test_unanimous_windows() {
        let signal = tones(&[440.0, 523.25, 659.25], 44100, 5.0);
        let mut aggregator = WindowedKeyAggregator::new(44100);
        let estimates = aggregator.window_estimates(&signal).unwrap();
        assert_eq!(estimates.len(), 3);
        assert!(estimates.iter().all(|k| *k == MusicalKey::AMinor));
        assert_eq!(aggregator.dominant_key(&signal).unwrap(), MusicalKey::AMinor);
    }

    #[test]
    fn test_short_signal_falls_back_to_whole_span() {
        let signal = tones(&[440.0], 44100, 0.3);
        let mut aggregator = WindowedKeyAggregator::new(44100);
        assert!(aggregator.window_estimates(&signal).unwrap().is_empty());
        assert_eq!(aggregator.dominant_key(&signal).unwrap(), MusicalKey::AMajor);
    }

    #[test]
    fn test_empty_signal_is_c_major() {
        let signal = Signal::new(Vec::new(), 44100);
        let mut aggregator = WindowedKeyAggregator::new(44100);
        assert_eq!(aggregator.dominant_key(&signal).unwrap(), MusicalKey::CMajor);
    }

    #[test]
    fn test_min_window_skips_short_spans() {
        let config = AggregatorConfig {
            window_secs: 0.25,
            hop_secs: 0.25,
            min_window_secs: 0.5,
        };
        let signal = tones(&[261.63, 329.63, 392.0], 44100, 2.0);
        let mut aggregator = WindowedKeyAggregator::with_config(44100, config);
        assert!(aggregator.window_estimates(&signal).unwrap().is_empty());
        // Whole-signal fallback still finds the chord
        assert_eq!(aggregator.dominant_key(&signal).unwrap(), MusicalKey::CMajor);
    }
}
