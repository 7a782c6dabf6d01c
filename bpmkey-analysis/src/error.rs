//! Analysis error types

use thiserror::Error;

/// Errors raised by the estimation stages
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// A NaN or infinite value reached a stage that cannot score it
    #[error("non-finite value encountered during {stage}")]
    NonFinite { stage: &'static str },

    /// A template label that has no entry in the key set
    #[error("template label '{label}' does not name a known key")]
    UnmappedTemplate { label: &'static str },
}
