//! Audio decoding using symphonia
//!
//! Produces mono f32 samples at the file's native sample rate. Channels
//! are averaged; nothing is resampled.

use crate::error::PipelineError;
use bpmkey_analysis::Signal;
use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace};

/// Decode an audio file to a mono signal
pub fn decode(path: &Path) -> Result<Signal, PipelineError> {
    let file = std::fs::File::open(path)
        .map_err(|e| PipelineError::decode(path, format!("Failed to open file: {}", e)))?;

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    decode_source(Box::new(file), hint, path)
}

/// Decode an in-memory audio file to a mono signal
///
/// `extension` is only a probing hint (e.g. "wav", "mp3").
pub fn decode_bytes(bytes: Vec<u8>, extension: Option<&str>) -> Result<Signal, PipelineError> {
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    decode_source(Box::new(Cursor::new(bytes)), hint, Path::new("<memory>"))
}

fn decode_source(
    source: Box<dyn MediaSource>,
    hint: Hint,
    path: &Path,
) -> Result<Signal, PipelineError> {
    let mss = MediaSourceStream::new(source, Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PipelineError::decode(path, format!("Failed to probe format: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PipelineError::decode(path, "No audio track found"))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let mut sample_rate = codec_params.sample_rate;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| PipelineError::decode(path, format!("Failed to create decoder: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(PipelineError::decode(
                    path,
                    format!("Failed to read packet: {}", e),
                ));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                trace!("Skipping corrupted frame: {}", e);
                continue;
            }
            Err(e) => {
                return Err(PipelineError::decode(path, format!("Decode error: {}", e)));
            }
        };

        let spec = *decoded.spec();
        sample_rate = Some(spec.rate);
        let channels = spec.channels.count().max(1);

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend(to_mono(sample_buf.samples(), channels));
    }

    let sample_rate = sample_rate
        .filter(|&rate| rate > 0)
        .ok_or_else(|| PipelineError::decode(path, "Unknown sample rate"))?;

    debug!(
        "Decoded {}: {} samples @ {}Hz ({:.2}s)",
        path.display(),
        samples.len(),
        sample_rate,
        samples.len() as f64 / sample_rate as f64
    );

    Ok(Signal::new(samples, sample_rate))
}

/// Average interleaved frames down to one channel
fn to_mono(samples: &[f32], channels: usize) -> impl Iterator<Item = f32> + '_ {
    samples
        .chunks(channels)
        .map(move |frame| frame.iter().sum::<f32>() / channels as f32)
}
