//! Simple configuration persistence for bpmkey
//!
//! Stores the transcoder location, key window geometry and worker count.

use crate::transcode::FfmpegTranscoder;
use bpmkey_analysis::AggregatorConfig;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Shortest key window hop accepted from the config file, in seconds
const MIN_HOP_SECS: f64 = 0.01;

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// ffmpeg executable used for non-WAV inputs
    pub ffmpeg_path: PathBuf,
    /// Whether non-WAV inputs go through ffmpeg at all
    pub transcode: bool,
    /// Key window length in seconds
    pub window_secs: f64,
    /// Key window hop in seconds
    pub hop_secs: f64,
    /// Shortest span that gets a key estimate, in seconds
    pub min_window_secs: f64,
    /// Worker threads for batch analysis (None = available parallelism)
    pub jobs: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        let aggregator = AggregatorConfig::default();
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            transcode: true,
            window_secs: aggregator.window_secs,
            hop_secs: aggregator.hop_secs,
            min_window_secs: aggregator.min_window_secs,
            jobs: None,
        }
    }
}

impl Config {
    /// Load config from the default location
    ///
    /// Returns default config if file doesn't exist or can't be read.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path()).unwrap_or_default()
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.serialize())
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bpmkey")
            .join("config.txt")
    }

    /// Key window geometry
    pub fn aggregator(&self) -> AggregatorConfig {
        AggregatorConfig {
            window_secs: self.window_secs,
            hop_secs: self.hop_secs,
            min_window_secs: self.min_window_secs,
        }
    }

    /// Transcoder to use, if transcoding is enabled
    pub fn transcoder(&self) -> Option<FfmpegTranscoder> {
        self.transcode
            .then(|| FfmpegTranscoder::new(self.ffmpeg_path.clone()))
    }

    /// Parse config from simple key=value format
    fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "ffmpeg_path" if !value.is_empty() => config.ffmpeg_path = PathBuf::from(value),
                "transcode" => set(&mut config.transcode, key, value),
                "window_secs" => set_seconds(&mut config.window_secs, key, value, 0.0),
                "hop_secs" => set_seconds(&mut config.hop_secs, key, value, MIN_HOP_SECS),
                "min_window_secs" => set_seconds(&mut config.min_window_secs, key, value, 0.0),
                "jobs" => match value.parse::<usize>() {
                    Ok(n) if n > 0 => config.jobs = Some(n),
                    _ => warn!("Ignoring invalid config value {}={}", key, value),
                },
                _ => {} // Ignore unknown keys
            }
        }

        config
    }

    /// Serialize config to simple key=value format
    fn serialize(&self) -> String {
        let mut lines = vec![
            "# bpmkey configuration".to_string(),
            format!("ffmpeg_path={}", self.ffmpeg_path.display()),
            format!("transcode={}", self.transcode),
            format!("window_secs={}", self.window_secs),
            format!("hop_secs={}", self.hop_secs),
            format!("min_window_secs={}", self.min_window_secs),
        ];
        if let Some(jobs) = self.jobs {
            lines.push(format!("jobs={}", jobs));
        }
        lines.join("\n")
    }
}

fn set<T: std::str::FromStr>(slot: &mut T, key: &str, value: &str) {
    match value.parse() {
        Ok(v) => *slot = v,
        Err(_) => warn!("Ignoring invalid config value {}={}", key, value),
    }
}

/// Positive, finite and at least `min` seconds
fn set_seconds(slot: &mut f64, key: &str, value: &str, min: f64) {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 && v >= min => *slot = v,
        _ => warn!("Ignoring invalid config value {}={}", key, value),
    }
}
