//! Command-line interface definition

use bpmkey_library::Config;
use clap::Parser;
use std::path::PathBuf;

/// Estimate tempo, key and Camelot code of music files
#[derive(Parser, Debug)]
#[command(name = "bpmkey")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Audio files to analyze
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Number of worker threads (defaults to the number of CPUs)
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Decode every format directly instead of converting non-WAV files with ffmpeg
    #[arg(long)]
    pub no_transcode: bool,

    /// Path to the ffmpeg executable
    #[arg(long, value_name = "PATH", env = "BPMKEY_FFMPEG")]
    pub ffmpeg: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Read settings from this file instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Layer command-line overrides on top of the file config
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(ffmpeg) = &self.ffmpeg {
            config.ffmpeg_path = ffmpeg.clone();
        }
        if self.no_transcode {
            config.transcode = false;
        }
        if let Some(jobs) = self.jobs.filter(|&n| n > 0) {
            config.jobs = Some(jobs);
        }
        config
    }
}
