//! Integration tests for the bpmkey analysis pipeline
//!
//! WAV fixtures are generated on the fly with hound; compressed inputs
//! are simulated with in-process transcoders.

use bpmkey_library::{
    decode_bytes, AnalysisPipeline, AnalysisResult, PipelineError, TempArtifact, TranscodeError,
    Transcoder,
};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const SAMPLE_RATE: u32 = 44100;

fn wav_spec(channels: u16) -> hound::WavSpec {
    hound::WavSpec {
        channels,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

fn sine(frequency_hz: f32, duration_secs: f32) -> Vec<f32> {
    use std::f32::consts::PI;
    let num_samples = (duration_secs * SAMPLE_RATE as f32) as usize;
    (0..num_samples)
        .map(|i| (2.0 * PI * frequency_hz * i as f32 / SAMPLE_RATE as f32).sin() * 0.5)
        .collect()
}

fn click_track(bpm: f32, duration_secs: f32) -> Vec<f32> {
    let num_samples = (duration_secs * SAMPLE_RATE as f32) as usize;
    let samples_per_beat = (60.0 / bpm * SAMPLE_RATE as f32) as usize;
    let impulse_samples = (0.005 * SAMPLE_RATE as f32) as usize;
    (0..num_samples)
        .map(|i| {
            let pos = i % samples_per_beat;
            if pos < impulse_samples {
                0.8 * (-5.0 * pos as f32 / impulse_samples as f32).exp()
            } else {
                0.0
            }
        })
        .collect()
}

fn write_wav(path: &Path, samples: &[f32]) {
    let mut writer = hound::WavWriter::create(path, wav_spec(1)).expect("Failed to create WAV file");
    for &sample in samples {
        writer
            .write_sample((sample * 32767.0) as i16)
            .expect("Failed to write sample");
    }
    writer.finalize().expect("Failed to finalize WAV");
}

fn wav_bytes(samples: &[f32], channels: u16) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, wav_spec(channels)).expect("Failed to create writer");
        for &sample in samples {
            for _ in 0..channels {
                writer
                    .write_sample((sample * 32767.0) as i16)
                    .expect("Failed to write sample");
            }
        }
        writer.finalize().expect("Failed to finalize WAV");
    }
    cursor.into_inner()
}

/// Copies a prepared WAV into a fresh artifact and remembers where it put it
struct CopyTranscoder {
    source: PathBuf,
    scratch: PathBuf,
    last_output: Arc<Mutex<Option<PathBuf>>>,
}

impl Transcoder for CopyTranscoder {
    fn transcode(&self, _input: &Path) -> Result<TempArtifact, TranscodeError> {
        let output = self.scratch.join("intermediate.wav");
        std::fs::copy(&self.source, &output)?;
        *self.last_output.lock().unwrap() = Some(output.clone());
        Ok(TempArtifact::new(output))
    }

    fn name(&self) -> &'static str {
        "copy"
    }
}

/// Writes bytes that no decoder accepts
struct GarbageTranscoder {
    scratch: PathBuf,
    last_output: Arc<Mutex<Option<PathBuf>>>,
}

impl Transcoder for GarbageTranscoder {
    fn transcode(&self, _input: &Path) -> Result<TempArtifact, TranscodeError> {
        let output = self.scratch.join("garbage.wav");
        let artifact = TempArtifact::new(&output);
        std::fs::write(&output, b"this is not a riff file")?;
        *self.last_output.lock().unwrap() = Some(output);
        Ok(artifact)
    }

    fn name(&self) -> &'static str {
        "garbage"
    }
}

struct FailingTranscoder;

impl Transcoder for FailingTranscoder {
    fn transcode(&self, input: &Path) -> Result<TempArtifact, TranscodeError> {
        Err(TranscodeError::MissingOutput(input.with_extension("wav")))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

#[test]
fn test_sine_440_is_a_major() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a440.wav");
    write_wav(&path, &sine(440.0, 5.0));

    let result = AnalysisPipeline::new().analyze(&path).unwrap();
    assert_eq!(result.key, "A");
    assert_eq!(result.camelot, "11B");
    assert!((0.0..=300.0).contains(&result.bpm));
}

#[test]
fn test_silence_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("silence.wav");
    write_wav(&path, &vec![0.0; SAMPLE_RATE as usize * 4]);

    let result = AnalysisPipeline::new().analyze(&path).unwrap();
    assert_eq!(
        result,
        AnalysisResult {
            bpm: 0.0,
            key: "C".to_string(),
            camelot: "8B".to_string(),
        }
    );
}

#[test]
fn test_very_short_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blip.wav");
    write_wav(&path, &click_track(120.0, 0.3));

    let result = AnalysisPipeline::new().analyze(&path).unwrap();
    assert_eq!(result.bpm, 0.0);
    assert!(!result.key.is_empty());
    assert!(!result.camelot.is_empty());
}

#[test]
fn test_click_track_tempo() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("click120.wav");
    write_wav(&path, &click_track(120.0, 10.0));

    let result = AnalysisPipeline::new().analyze(&path).unwrap();
    assert!(
        (result.bpm - 120.0).abs() < 2.0,
        "expected ~120 BPM, got {}",
        result.bpm
    );
}

#[test]
fn test_analysis_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mix.wav");
    let samples: Vec<f32> = sine(261.63, 6.0)
        .iter()
        .zip(click_track(100.0, 6.0))
        .map(|(s, c)| s * 0.5 + c * 0.5)
        .collect();
    write_wav(&path, &samples);

    let pipeline = AnalysisPipeline::new();
    let first = pipeline.analyze(&path).unwrap();
    let second = pipeline.analyze(&path).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_missing_file_is_decode_error() {
    let err = AnalysisPipeline::new()
        .analyze(Path::new("/nonexistent/track.wav"))
        .unwrap_err();
    assert!(err.is_decode());
}

#[test]
fn test_decode_bytes_downmixes_stereo() {
    let samples = sine(440.0, 1.0);
    let signal = decode_bytes(wav_bytes(&samples, 2), Some("wav")).unwrap();
    assert_eq!(signal.sample_rate(), SAMPLE_RATE);
    assert_eq!(signal.len(), samples.len());
}

#[test]
fn test_transcoded_artifact_removed_after_success() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("source.wav");
    write_wav(&source, &sine(440.0, 4.0));

    let last_output = Arc::new(Mutex::new(None));
    let pipeline = AnalysisPipeline::new().with_transcoder(CopyTranscoder {
        source,
        scratch: dir.path().to_path_buf(),
        last_output: Arc::clone(&last_output),
    });

    let result = pipeline.analyze(&dir.path().join("track.mp3")).unwrap();
    assert_eq!(result.key, "A");

    let intermediate = last_output.lock().unwrap().clone().unwrap();
    assert!(!intermediate.exists());
}

#[test]
fn test_transcoded_artifact_removed_after_decode_failure() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("track.flac");

    let last_output = Arc::new(Mutex::new(None));
    let pipeline = AnalysisPipeline::new().with_transcoder(GarbageTranscoder {
        scratch: dir.path().to_path_buf(),
        last_output: Arc::clone(&last_output),
    });

    match pipeline.analyze(&input) {
        Err(PipelineError::Decode { path, .. }) => assert_eq!(path, input),
        other => panic!("expected decode error, got {:?}", other),
    }

    let intermediate = last_output.lock().unwrap().clone().unwrap();
    assert!(!intermediate.exists());
}

#[test]
fn test_transcoder_failure_is_decode_error() {
    let pipeline = AnalysisPipeline::new().with_transcoder(FailingTranscoder);
    let err = pipeline.analyze(Path::new("track.m4a")).unwrap_err();
    assert!(err.is_decode());
}

#[test]
fn test_wav_skips_transcoder() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("direct.WAV");
    write_wav(&path, &sine(440.0, 4.0));

    let pipeline = AnalysisPipeline::new().with_transcoder(FailingTranscoder);
    assert_eq!(pipeline.analyze(&path).unwrap().key, "A");
}

#[test]
fn test_result_json_shape() {
    let result = AnalysisResult::new(128.0, "Db");
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["bpm"], 128.0);
    assert_eq!(json["key"], "Db");
    assert_eq!(json["camelot"], "3B");
    assert_eq!(json.as_object().unwrap().len(), 3);
}
