//! MP3 encoding via an ffmpeg subprocess.
//!
//! Decoded samples are piped to ffmpeg as raw `f32le` PCM on stdin and
//! encoded with libmp3lame at a constant bitrate.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::AudioBuffer;
use crate::error::ProcessingError;

/// Writes an [`AudioBuffer`] to disk as MP3.
///
/// Implement this trait to swap the encoder out in tests.
pub trait Mp3Encoder: Send + Sync {
    fn encode(
        &self,
        buffer: &AudioBuffer,
        bitrate_kbps: u32,
        destination: &Path,
    ) -> Result<(), ProcessingError>;
}

/// Encoder that shells out to ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    ffmpeg_path: PathBuf,
}

impl FfmpegEncoder {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    // -f f32le -ar/-ac : raw interleaved input on stdin
    // -codec:a libmp3lame -b:a <n>k : constant bitrate MP3
    // -y : overwrite the destination
    fn args(buffer: &AudioBuffer, bitrate_kbps: u32, destination: &Path) -> Vec<String> {
        vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-f".into(),
            "f32le".into(),
            "-ar".into(),
            buffer.sample_rate().to_string(),
            "-ac".into(),
            buffer.channels().to_string(),
            "-i".into(),
            "pipe:0".into(),
            "-codec:a".into(),
            "libmp3lame".into(),
            "-b:a".into(),
            format!("{}k", bitrate_kbps),
            "-f".into(),
            "mp3".into(),
            "-y".into(),
            destination.to_string_lossy().into_owned(),
        ]
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Mp3Encoder for FfmpegEncoder {
    fn encode(
        &self,
        buffer: &AudioBuffer,
        bitrate_kbps: u32,
        destination: &Path,
    ) -> Result<(), ProcessingError> {
        if buffer.is_empty() {
            return Err(ProcessingError::encode(destination, "nothing left to encode"));
        }

        let mut child = Command::new(&self.ffmpeg_path)
            .args(Self::args(buffer, bitrate_kbps, destination))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ProcessingError::encode(destination, format!("Failed to spawn ffmpeg: {}", e))
            })?;

        // Feed stdin from a separate thread so a chatty stderr can't stall us
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProcessingError::encode(destination, "ffmpeg stdin unavailable"))?;
        let pcm = buffer.to_le_bytes();
        let writer = std::thread::spawn(move || stdin.write_all(&pcm));

        let output = child
            .wait_with_output()
            .map_err(|e| ProcessingError::encode(destination, e.to_string()))?;
        let write_result = writer
            .join()
            .map_err(|_| ProcessingError::encode(destination, "stdin writer panicked"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProcessingError::encode(
                destination,
                format!(
                    "ffmpeg exited with status {}: {}",
                    output.status,
                    stderr.lines().last().unwrap_or("Unknown error")
                ),
            ));
        }
        write_result.map_err(|e| ProcessingError::encode(destination, e.to_string()))?;

        tracing::debug!(
            destination = %destination.display(),
            bitrate_kbps,
            "Encoded MP3"
        );
        Ok(())
    }
}
