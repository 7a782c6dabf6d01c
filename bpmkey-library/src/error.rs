//! Error types for loading and analyzing tracks

use bpmkey_analysis::AnalysisError;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of the external transcoding step
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("transcoder exited with {status}")]
    Failed { status: std::process::ExitStatus },
    #[error("transcoder produced no output at '{0}'")]
    MissingOutput(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that end the analysis of one track
///
/// No partial result is ever produced alongside one of these.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input (or its transcoded form) could not be read as audio
    #[error("Failed to decode audio file '{path}': {reason}")]
    Decode { path: PathBuf, reason: String },

    /// Unexpected numeric failure inside the estimators
    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
}

impl PipelineError {
    /// Create a decode error for a path
    pub fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PipelineError::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for failures caused by the input file rather than the analysis
    pub fn is_decode(&self) -> bool {
        matches!(self, PipelineError::Decode { .. })
    }
}
