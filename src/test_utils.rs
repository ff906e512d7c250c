//! Test utilities and fixtures for show-trimmer tests.
//!
//! Provides metadata rows, synthetic audio buffers, WAV/MP3 fixture files
//! and stub encoders so pipeline tests run without ffmpeg.
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::{silence_then_tone, write_wav, StubEncoder};
//!
//! let buffer = silence_then_tone(8_000, 1, 500, 1_000, 500);
//! write_wav(&path, buffer.samples(), 8_000, 1);
//! ```

use lofty::file::TaggedFileExt;
use lofty::tag::Tag;
use std::f32::consts::PI;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::subscriber::DefaultGuard;

use crate::audio::{AudioBuffer, Mp3Encoder};
use crate::error::ProcessingError;
use crate::metadata::{EpisodeNumber, ShowMetadata};

/// MPEG-1 Layer III, 128 kbps, 44.1 kHz, joint stereo, no padding.
const MP3_FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x64];
/// 144 * 128000 / 44100
const MP3_FRAME_LEN: usize = 417;
const MP3_FRAME_COUNT: usize = 16;

/// Creates a metadata row. Pass `""` for `dj` to exercise the fallback.
pub fn show_row(show: &str, dj: &str, episode: i64, genre: &str) -> ShowMetadata {
    ShowMetadata {
        show_name: show.to_string(),
        dj_name: dj.to_string(),
        episode_number: EpisodeNumber::from(episode),
        genre: genre.to_string(),
    }
}

/// A 440 Hz sine at `amplitude` on every channel.
pub fn tone(sample_rate: u32, channels: u16, ms: u64, amplitude: f32) -> AudioBuffer {
    let frames = (sample_rate as u64 * ms / 1000) as usize;
    let samples = (0..frames)
        .flat_map(|i| {
            let t = i as f32 / sample_rate as f32;
            let value = amplitude * (2.0 * PI * 440.0 * t).sin();
            std::iter::repeat_n(value, channels as usize)
        })
        .collect();
    AudioBuffer::new(samples, sample_rate, channels)
}

/// Digital silence, a loud tone, then silence again.
pub fn silence_then_tone(
    sample_rate: u32,
    channels: u16,
    lead_ms: u64,
    tone_ms: u64,
    tail_ms: u64,
) -> AudioBuffer {
    let silence = |ms: u64| vec![0.0f32; (sample_rate as u64 * ms / 1000) as usize * channels as usize];

    let mut samples = silence(lead_ms);
    samples.extend_from_slice(tone(sample_rate, channels, tone_ms, 0.5).samples());
    samples.extend(silence(tail_ms));
    AudioBuffer::new(samples, sample_rate, channels)
}

/// Writes interleaved `samples` as a 16-bit PCM WAV file.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create WAV file");
    for sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(value).expect("Failed to write sample");
    }
    writer.finalize().expect("Failed to finalize WAV file");
}

/// Writes a run of silent MPEG frames that lofty recognises as MP3.
pub fn write_stub_mp3(path: &Path) {
    fs::write(path, stub_mp3_bytes()).expect("Failed to write stub MP3");
}

fn stub_mp3_bytes() -> Vec<u8> {
    let mut bytes = Vec::with_capacity(MP3_FRAME_LEN * MP3_FRAME_COUNT);
    for _ in 0..MP3_FRAME_COUNT {
        bytes.extend_from_slice(&MP3_FRAME_HEADER);
        bytes.resize(bytes.len() + MP3_FRAME_LEN - MP3_FRAME_HEADER.len(), 0);
    }
    bytes
}

/// Reads back the primary tag of a file.
pub fn read_tag(path: &Path) -> Tag {
    let tagged = lofty::read_from_path(path).expect("Failed to read tagged file");
    tagged.primary_tag().cloned().expect("File has no primary tag")
}

/// Encoder that writes [`write_stub_mp3`] frames instead of real audio.
#[derive(Default)]
pub struct StubEncoder {
    calls: Option<Arc<Mutex<usize>>>,
    must_exist: Option<PathBuf>,
}

impl StubEncoder {
    /// Increments `calls` on every encode.
    pub fn counting(calls: Arc<Mutex<usize>>) -> Self {
        Self {
            calls: Some(calls),
            must_exist: None,
        }
    }

    /// Panics if `path` is gone by the time encoding starts.
    pub fn asserting_exists(path: PathBuf) -> Self {
        Self {
            calls: None,
            must_exist: Some(path),
        }
    }
}

impl Mp3Encoder for StubEncoder {
    fn encode(
        &self,
        _buffer: &AudioBuffer,
        _bitrate_kbps: u32,
        destination: &Path,
    ) -> Result<(), ProcessingError> {
        if let Some(ref calls) = self.calls {
            *calls.lock().unwrap() += 1;
        }
        if let Some(ref path) = self.must_exist {
            assert!(path.exists(), "{} removed before encode", path.display());
        }
        fs::write(destination, stub_mp3_bytes())
            .map_err(|e| ProcessingError::encode(destination, e.to_string()))
    }
}

/// Encoder that leaves a partial file behind and fails.
pub struct FailingEncoder;

impl Mp3Encoder for FailingEncoder {
    fn encode(
        &self,
        _buffer: &AudioBuffer,
        _bitrate_kbps: u32,
        destination: &Path,
    ) -> Result<(), ProcessingError> {
        let _ = fs::write(destination, &MP3_FRAME_HEADER);
        Err(ProcessingError::encode(destination, "encoder crashed"))
    }
}

/// Collects formatted log output of the current thread while alive.
///
/// `#[tokio::test]` runs on a current-thread runtime, so events from the
/// driver under test land here.
pub struct LogCapture {
    output: Arc<Mutex<Vec<u8>>>,
    _guard: DefaultGuard,
}

struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    pub fn start() -> Self {
        let output = Arc::new(Mutex::new(Vec::new()));
        let writer = output.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || CaptureWriter(writer.clone()))
            .finish();
        Self {
            output,
            _guard: tracing::subscriber::set_default(subscriber),
        }
    }

    /// Captured lines containing `needle` at `level` (e.g. "WARN").
    pub fn count(&self, level: &str, needle: &str) -> usize {
        let output = self.output.lock().unwrap();
        String::from_utf8_lossy(&output)
            .lines()
            .filter(|line| line.contains(level) && line.contains(needle))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_show_row_defaults() {
        let meta = show_row("Show Name", "", 12, "House");
        assert_eq!(meta.show_name, "Show Name");
        assert_eq!(meta.episode_number.as_str(), "12");
        assert!(meta.dj_name.is_empty());
    }

    #[test]
    fn test_silence_then_tone_layout() {
        let buffer = silence_then_tone(8_000, 2, 100, 200, 50);
        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.duration_ms(), 350);
        assert_eq!(buffer.samples()[0], 0.0);
        assert_eq!(*buffer.samples().last().unwrap(), 0.0);
    }

    #[test]
    fn test_stub_mp3_is_detected_as_mpeg() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stub.mp3");
        write_stub_mp3(&path);

        let tagged = lofty::read_from_path(&path).unwrap();
        assert_eq!(tagged.file_type(), lofty::file::FileType::Mpeg);
    }

    #[test]
    fn test_counting_stub_counts() {
        let dir = tempdir().unwrap();
        let calls = Arc::new(Mutex::new(0));
        let encoder = StubEncoder::counting(calls.clone());
        let buffer = tone(8_000, 1, 10, 0.5);

        encoder.encode(&buffer, 320, &dir.path().join("a.mp3")).unwrap();
        encoder.encode(&buffer, 320, &dir.path().join("b.mp3")).unwrap();
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[test]
    fn test_log_capture_sees_events() {
        let logs = LogCapture::start();
        tracing::warn!(file = "a.wav", "Skipping file");
        tracing::debug!("below the capture level");

        assert_eq!(logs.count("WARN", "Skipping file"), 1);
        assert_eq!(logs.count("DEBUG", "below"), 0);
    }
}
