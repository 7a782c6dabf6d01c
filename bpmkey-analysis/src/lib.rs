//! Audio analysis core for bpmkey
//!
//! Provides chroma extraction, template-based key estimation with
//! sliding-window voting, onset-based tempo estimation and Camelot
//! wheel mapping. Everything here works on in-memory mono samples.

mod camelot;
mod chroma;
mod error;
mod key;
mod signal;
mod tempo;
mod templates;
mod window;

pub use camelot::{camelot_code, to_flat, CamelotKey, Mode, MusicalKey};
pub use chroma::{pitch_class_of, Chroma, ChromaExtractor, PITCH_CLASSES, PITCH_CLASS_NAMES};
pub use error::AnalysisError;
pub use key::{KeyEstimator, SCORE_TOLERANCE};
pub use signal::Signal;
pub use tempo::{TempoEstimator, MAX_BPM, MIN_BPM, PERIODICITY_FLOOR};
pub use templates::{KeyTemplate, KeyTemplateBank};
pub use window::{majority_vote, AggregatorConfig, WindowedKeyAggregator};
