//! Audio decoder using symphonia for multi-format support.
//!
//! Supported formats:
//! - WAV/PCM
//! - FLAC
//! - MP3
//! - OGG Vorbis
//! - AAC (in MP4 container)

use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{CODEC_TYPE_NULL, Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::AudioBuffer;
use crate::error::ProcessingError;

/// Decodes a whole file into memory.
pub fn decode_file(path: &Path) -> Result<AudioBuffer, ProcessingError> {
    let mut decoder = SourceDecoder::open(path)?;
    let mut samples = Vec::new();
    while decoder.decode_next(&mut samples)? {}

    if samples.is_empty() {
        return Err(ProcessingError::decode(path, "No audio samples decoded"));
    }
    let buffer = AudioBuffer::new(samples, decoder.sample_rate, decoder.channels);
    tracing::debug!(
        path = %path.display(),
        frames = buffer.frames(),
        sample_rate = buffer.sample_rate(),
        channels = buffer.channels(),
        "Decoded source"
    );
    Ok(buffer)
}

/// Wrapper over a symphonia reader/decoder pair for one audio track.
struct SourceDecoder {
    path: PathBuf,
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: u16,
}

impl SourceDecoder {
    fn open(path: &Path) -> Result<Self, ProcessingError> {
        let file = File::open(path).map_err(|e| ProcessingError::decode(path, e.to_string()))?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension() {
            hint.with_extension(&ext.to_string_lossy());
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| ProcessingError::decode(path, e.to_string()))?;

        let reader = probed.format;

        // Find the first audio track
        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| ProcessingError::decode(path, "No audio track found"))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| ProcessingError::decode(path, "Unknown sample rate"))?;
        let channels = codec_params.channels.map(|c| c.count() as u16).unwrap_or(2);

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| ProcessingError::decode(path, e.to_string()))?;

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            decoder,
            track_id,
            sample_rate,
            channels,
        })
    }

    /// Appends the next packet's samples to `out`.
    ///
    /// Returns `Ok(false)` at end of stream.
    fn decode_next(&mut self, out: &mut Vec<f32>) -> Result<bool, ProcessingError> {
        loop {
            let packet = match self.reader.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(false);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(ProcessingError::decode(&self.path, e.to_string())),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(msg)) => {
                    tracing::debug!(path = %self.path.display(), msg, "Skipping bad frame");
                    continue;
                }
                Err(e) => return Err(ProcessingError::decode(&self.path, e.to_string())),
            };

            append_interleaved(&decoded, out);
            return Ok(true);
        }
    }
}

/// Appends an audio buffer to `out` as interleaved f32 samples.
fn append_interleaved(buffer: &AudioBufferRef, out: &mut Vec<f32>) {
    macro_rules! interleave {
        ($buf:expr, $convert:expr) => {{
            let planes = $buf.planes();
            let planes = planes.planes();
            out.reserve($buf.frames() * planes.len());
            for frame in 0..$buf.frames() {
                for plane in planes {
                    out.push($convert(plane[frame]));
                }
            }
        }};
    }

    match buffer {
        AudioBufferRef::F32(buf) => interleave!(buf, |s: f32| s),
        AudioBufferRef::F64(buf) => interleave!(buf, |s: f64| s as f32),
        AudioBufferRef::S16(buf) => interleave!(buf, |s: i16| s as f32 / 32768.0),
        AudioBufferRef::S24(buf) => {
            interleave!(buf, |s: symphonia::core::sample::i24| s.0 as f32 / 8388608.0)
        }
        AudioBufferRef::S32(buf) => interleave!(buf, |s: i32| s as f32 / 2147483648.0),
        AudioBufferRef::U8(buf) => interleave!(buf, |s: u8| (s as f32 - 128.0) / 128.0),
        _ => {}
    }
}
