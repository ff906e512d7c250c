//! Silence trimming and fade envelopes.
//!
//! Leading silence is found by walking the buffer in fixed-size chunks and
//! stopping at the first chunk whose RMS level reaches the threshold.
//! Trailing silence uses the same scan on the reversed buffer.

use super::AudioBuffer;
use crate::error::ProcessingError;

/// Parameters for [`trim_and_fade`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimSettings {
    /// Chunks quieter than this (dBFS) count as silence
    pub silence_threshold_dbfs: f32,
    /// Detection chunk length
    pub chunk_ms: u64,
    /// Fade-in and fade-out length
    pub fade_ms: u64,
}

impl Default for TrimSettings {
    fn default() -> Self {
        Self {
            silence_threshold_dbfs: -50.0,
            chunk_ms: 10,
            fade_ms: 3000,
        }
    }
}

/// Trims leading and trailing silence, then fades in and out.
///
/// An all-silent buffer comes back empty rather than as an error.
pub fn trim_and_fade(
    buffer: &AudioBuffer,
    settings: &TrimSettings,
) -> Result<AudioBuffer, ProcessingError> {
    validate(buffer, settings)?;

    let trimmed = trim_trailing_silence(
        &trim_leading_silence(buffer, settings),
        settings,
    );

    tracing::debug!(
        original_ms = buffer.duration_ms(),
        trimmed_ms = trimmed.duration_ms(),
        "Trimmed silence"
    );

    Ok(fade_out(&fade_in(&trimmed, settings.fade_ms), settings.fade_ms))
}

/// Frame offset of the first chunk at or above the threshold.
///
/// Returns the buffer length when every chunk is silent.
pub fn detect_leading_silence(buffer: &AudioBuffer, settings: &TrimSettings) -> usize {
    let frames = buffer.frames();
    let chunk = buffer.ms_to_frames(settings.chunk_ms).max(1);

    let mut cut = 0;
    while cut < frames {
        let window = buffer.slice_frames(cut, cut.saturating_add(chunk));
        if dbfs(window.samples()) >= settings.silence_threshold_dbfs {
            break;
        }
        cut = cut.saturating_add(chunk);
    }
    cut.min(frames)
}

pub fn trim_leading_silence(buffer: &AudioBuffer, settings: &TrimSettings) -> AudioBuffer {
    let start = detect_leading_silence(buffer, settings);
    buffer.slice_frames(start, buffer.frames())
}

pub fn trim_trailing_silence(buffer: &AudioBuffer, settings: &TrimSettings) -> AudioBuffer {
    trim_leading_silence(&buffer.reversed(), settings).reversed()
}

/// Linear ramp from silence to full level over the first `fade_ms`.
pub fn fade_in(buffer: &AudioBuffer, fade_ms: u64) -> AudioBuffer {
    let fade = buffer.ms_to_frames(fade_ms).min(buffer.frames());
    apply_gain(buffer, |frame| {
        if frame < fade {
            frame as f32 / fade as f32
        } else {
            1.0
        }
    })
}

/// Linear ramp from full level to silence over the last `fade_ms`.
pub fn fade_out(buffer: &AudioBuffer, fade_ms: u64) -> AudioBuffer {
    let frames = buffer.frames();
    let fade = buffer.ms_to_frames(fade_ms).min(frames);
    let start = frames - fade;
    apply_gain(buffer, |frame| {
        if frame >= start && fade > 0 {
            (frames - 1 - frame) as f32 / fade as f32
        } else {
            1.0
        }
    })
}

fn apply_gain(buffer: &AudioBuffer, gain: impl Fn(usize) -> f32) -> AudioBuffer {
    let ch = buffer.channels() as usize;
    let samples = buffer
        .samples()
        .chunks(ch)
        .enumerate()
        .flat_map(|(frame, values)| {
            let g = gain(frame);
            values.iter().map(move |s| s * g)
        })
        .collect();
    AudioBuffer::new(samples, buffer.sample_rate(), buffer.channels())
}

/// RMS level relative to full scale. Digital silence is `-inf`.
fn dbfs(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return f32::NEG_INFINITY;
    }
    let mean_square =
        samples.iter().map(|s| (*s as f64) * (*s as f64)).sum::<f64>() / samples.len() as f64;
    if mean_square == 0.0 {
        return f32::NEG_INFINITY;
    }
    (10.0 * mean_square.log10()) as f32
}

fn validate(buffer: &AudioBuffer, settings: &TrimSettings) -> Result<(), ProcessingError> {
    if buffer.sample_rate() == 0 {
        return Err(ProcessingError::trim("sample rate is zero"));
    }
    if buffer.channels() == 0 {
        return Err(ProcessingError::trim("buffer has no channels"));
    }
    if buffer.samples().len() % buffer.channels() as usize != 0 {
        return Err(ProcessingError::trim(format!(
            "{} samples do not divide into {} channels",
            buffer.samples().len(),
            buffer.channels()
        )));
    }
    if !settings.silence_threshold_dbfs.is_finite() {
        return Err(ProcessingError::trim("silence threshold is not finite"));
    }
    Ok(())
}
