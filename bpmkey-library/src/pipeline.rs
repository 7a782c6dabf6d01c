//! Track analysis pipeline
//!
//! decode (through the transcoder when needed) -> tempo -> windowed key
//! vote -> Camelot code -> [`AnalysisResult`].

use crate::decoder;
use crate::error::PipelineError;
use crate::transcode::{needs_transcode, Transcoder};
use bpmkey_analysis::{
    camelot_code, AggregatorConfig, AnalysisError, Signal, TempoEstimator, WindowedKeyAggregator,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Tempo, key and Camelot code of one track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Tempo in BPM, rounded to 2 decimals (0.0 when no beat was found)
    pub bpm: f64,
    /// Key label, e.g. "Db" or "C#m"
    pub key: String,
    /// Camelot code, e.g. "3B"; empty when the key has no wheel position
    pub camelot: String,
}

impl AnalysisResult {
    pub fn new(bpm: f32, key: impl Into<String>) -> Self {
        let key = key.into();
        let camelot = camelot_code(&key);
        Self {
            bpm: round_bpm(bpm),
            key,
            camelot,
        }
    }
}

/// Round to 2 decimal places
fn round_bpm(bpm: f32) -> f64 {
    let bpm = bpm as f64;
    if !bpm.is_finite() {
        return 0.0;
    }
    (bpm * 100.0).round() / 100.0
}

/// Analyzes one track per call; holds no per-track state
pub struct AnalysisPipeline {
    transcoder: Option<Box<dyn Transcoder>>,
    aggregator: AggregatorConfig,
}

impl Default for AnalysisPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisPipeline {
    /// Pipeline that hands every format straight to symphonia
    pub fn new() -> Self {
        Self {
            transcoder: None,
            aggregator: AggregatorConfig::default(),
        }
    }

    /// Route non-WAV inputs through `transcoder` before decoding
    pub fn with_transcoder(mut self, transcoder: impl Transcoder + 'static) -> Self {
        self.transcoder = Some(Box::new(transcoder));
        self
    }

    /// Override the key window geometry
    pub fn with_aggregator(mut self, config: AggregatorConfig) -> Self {
        self.aggregator = config;
        self
    }

    /// Decode a file into memory
    ///
    /// A transcoded intermediate is deleted before this returns, whether
    /// decoding succeeded or not.
    pub fn load(&self, path: &Path) -> Result<Signal, PipelineError> {
        match &self.transcoder {
            Some(transcoder) if needs_transcode(path) => {
                debug!("Transcoding {} with {}", path.display(), transcoder.name());
                let artifact = transcoder
                    .transcode(path)
                    .map_err(|e| PipelineError::decode(path, format!("Transcoding failed: {}", e)))?;
                let signal = decoder::decode(artifact.path());
                drop(artifact);
                signal.map_err(|e| match e {
                    PipelineError::Decode { reason, .. } => PipelineError::decode(path, reason),
                    other => other,
                })
            }
            _ => decoder::decode(path),
        }
    }

    /// Analyze an audio file
    pub fn analyze(&self, path: &Path) -> Result<AnalysisResult, PipelineError> {
        let start = Instant::now();
        let signal = self.load(path)?;
        let result = self.analyze_signal(&signal)?;

        info!(
            "{}: {:.2} BPM, {} ({}) in {:.2}s",
            path.display(),
            result.bpm,
            result.key,
            result.camelot,
            start.elapsed().as_secs_f64()
        );

        Ok(result)
    }

    /// Analyze samples that are already in memory
    pub fn analyze_signal(&self, signal: &Signal) -> Result<AnalysisResult, AnalysisError> {
        if signal.is_empty() {
            debug!("Empty signal, falling back to degenerate estimates");
        }

        let sample_rate = signal.sample_rate();
        let bpm = TempoEstimator::new(sample_rate).estimate(signal.samples());
        let key = WindowedKeyAggregator::with_config(sample_rate, self.aggregator)
            .dominant_key(signal)?;

        Ok(AnalysisResult::new(bpm, key.label()))
    }
}
