//! Track loading and analysis for bpmkey - decoding, transcoding, config

mod config;
mod decoder;
mod error;
mod pipeline;
mod transcode;

pub use config::Config;
pub use decoder::{decode, decode_bytes};
pub use error::{PipelineError, TranscodeError};
pub use pipeline::{AnalysisPipeline, AnalysisResult};
pub use transcode::{needs_transcode, FfmpegTranscoder, TempArtifact, Transcoder};
