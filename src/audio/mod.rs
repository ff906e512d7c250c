//! Decoded audio and the transforms applied before export.
//!
//! - [`decoder`]: symphonia-based decoding into an [`AudioBuffer`]
//! - [`trim`]: silence trimming and linear fades
//! - [`encoder`]: MP3 encoding behind the [`Mp3Encoder`] trait

pub mod decoder;
pub mod encoder;
pub mod trim;

pub use decoder::decode_file;
pub use encoder::{FfmpegEncoder, Mp3Encoder};
pub use trim::{TrimSettings, trim_and_fade};

use std::time::Duration;

/// Interleaved `f32` samples in `[-1.0, 1.0]`.
///
/// Transforms never mutate a buffer in place; each returns a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration().as_millis() as u64
    }

    /// Frame count covering `ms` milliseconds at this sample rate.
    ///
    /// Saturates instead of overflowing; callers clamp to `frames()`.
    pub fn ms_to_frames(&self, ms: u64) -> usize {
        let frames = ms.saturating_mul(self.sample_rate as u64) / 1000;
        usize::try_from(frames).unwrap_or(usize::MAX)
    }

    /// Copy of frames `start..end`, clamped to the buffer.
    pub fn slice_frames(&self, start: usize, end: usize) -> AudioBuffer {
        let ch = self.channels as usize;
        let end = end.min(self.frames());
        let start = start.min(end);
        AudioBuffer::new(
            self.samples[start * ch..end * ch].to_vec(),
            self.sample_rate,
            self.channels,
        )
    }

    /// Copy with frame order reversed; channel order within a frame is kept.
    pub fn reversed(&self) -> AudioBuffer {
        let ch = (self.channels as usize).max(1);
        let samples = self
            .samples
            .chunks(ch)
            .rev()
            .flatten()
            .copied()
            .collect();
        AudioBuffer::new(samples, self.sample_rate, self.channels)
    }

    /// Interleaved little-endian `f32` bytes, as fed to the encoder.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}
