//! Transcoding of compressed containers into WAV
//!
//! The pipeline only sees the [`Transcoder`] trait; [`FfmpegTranscoder`]
//! is the stock implementation that shells out to `ffmpeg`.

use crate::error::TranscodeError;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Intermediate file owned by the pipeline, removed on drop
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    /// Take ownership of a file; it is deleted when the artifact drops
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed intermediate {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {}", self.path.display(), e),
        }
    }
}

/// Converts an arbitrary audio container into an uncompressed WAV file
pub trait Transcoder: Send + Sync {
    /// Produce a decodable WAV copy of `input`
    fn transcode(&self, input: &Path) -> Result<TempArtifact, TranscodeError>;

    /// Get the name of this transcoder (for logging)
    fn name(&self) -> &'static str;
}

/// True unless the path already names a WAV file
pub fn needs_transcode(path: &Path) -> bool {
    !path
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

/// Transcoder backed by the `ffmpeg` command-line tool
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegTranscoder {
    /// Use a specific ffmpeg executable
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, input: &Path) -> Result<TempArtifact, TranscodeError> {
        let output = tempfile::Builder::new()
            .prefix("bpmkey-")
            .suffix(".wav")
            .tempfile()?
            .into_temp_path()
            .keep()
            .map_err(|e| TranscodeError::Io(e.error))?;
        // From here on the file is cleaned up by the artifact, whatever happens
        let artifact = TempArtifact::new(output);

        debug!(
            "Transcoding {} -> {}",
            input.display(),
            artifact.path().display()
        );

        let status = Command::new(&self.program)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg(artifact.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|source| TranscodeError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !status.success() {
            return Err(TranscodeError::Failed { status });
        }

        let written = std::fs::metadata(artifact.path())
            .map(|m| m.len())
            .unwrap_or(0);
        if written == 0 {
            return Err(TranscodeError::MissingOutput(artifact.path().to_path_buf()));
        }

        Ok(artifact)
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}
