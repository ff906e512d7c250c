//! Export with fallback copy.
//!
//! A processed buffer is encoded to the destination. If processing failed
//! earlier, or encoding fails now, the untouched source is copied to the
//! destination instead, so every consumed source leaves a file behind.
//! The source is removed only once the destination has been written.

use std::fs;
use std::path::Path;

use crate::audio::{AudioBuffer, Mp3Encoder};
use crate::error::{ExportError, ProcessingError};

/// How the destination file was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Trimmed, faded and encoded
    Passed,
    /// Source copied unmodified; carries the processing error
    Failed(String),
}

impl ExportOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, ExportOutcome::Passed)
    }
}

/// Writes the destination file, then deletes the source.
///
/// Returns `Err` when not even the fallback copy could be written (the
/// source is kept), or when the destination was written but the source
/// could not be removed ([`ExportError::RemoveSource`] carries the outcome).
pub fn export(
    processed: Result<AudioBuffer, ProcessingError>,
    encoder: &dyn Mp3Encoder,
    bitrate_kbps: u32,
    destination: &Path,
    source: &Path,
) -> Result<ExportOutcome, ExportError> {
    let display_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.display().to_string());

    let encoded = processed.and_then(|buffer| encoder.encode(&buffer, bitrate_kbps, destination));

    let outcome = match encoded {
        Ok(()) => {
            tracing::info!("PASSED: Trim and fade in/out for: {}", display_name);
            ExportOutcome::Passed
        }
        Err(e) => {
            tracing::info!("FAILED: Trim and fade in/out for: {}", display_name);
            tracing::error!(error = %e, "Processing failed, copying source unmodified");
            fallback_copy(source, destination)?;
            ExportOutcome::Failed(e.to_string())
        }
    };

    if let Err(error) = fs::remove_file(source) {
        return Err(ExportError::RemoveSource {
            path: source.to_path_buf(),
            error,
            outcome,
        });
    }

    Ok(outcome)
}

fn fallback_copy(source: &Path, destination: &Path) -> Result<(), ExportError> {
    fs::copy(source, destination)
        .map(|_| ())
        .map_err(|error| ExportError::FallbackCopy {
            source_path: source.to_path_buf(),
            destination: destination.to_path_buf(),
            error,
        })
}
