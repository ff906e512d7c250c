//! Application-wide error types.
//!
//! Library modules use specific error types via `thiserror`, while
//! CLI/main uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: Top-level error enum for startup and batch-level failures
//! - [`ProcessingError`]: decode/trim/encode failures, all of which route a
//!   file through the fallback copy
//! - [`MetadataError`], [`FilenameParseError`]: cause a file to be skipped
//! - [`TagWriteError`]: logged after export, never rolls it back
//! - [`ExportError`]: the fallback copy itself failed (source kept), or the
//!   destination was written but the source could not be removed

use std::path::PathBuf;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Metadata source could not be opened or queried
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// Export failed without producing a destination file
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Tag writing error
    #[error("Tag error: {0}")]
    Tag(#[from] TagWriteError),

    /// Source filename did not match the naming convention
    #[error("Filename error: {0}")]
    Filename(#[from] FilenameParseError),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Database(e).context(ctx))
    }
}

/// Failures while turning a source file into an encoded MP3.
///
/// Any of these sends the file down the fallback-copy path.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    /// Unreadable, corrupt or unsupported input audio
    #[error("Failed to decode {path}: {message}")]
    SourceDecode { path: PathBuf, message: String },

    /// Silence detection or fade failed
    #[error("Trim processing failed: {0}")]
    TrimProcessing(String),

    /// Encoder failed to write the destination
    #[error("Failed to encode {path}: {message}")]
    ExportEncode { path: PathBuf, message: String },
}

impl ProcessingError {
    pub fn decode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::SourceDecode {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn trim(message: impl Into<String>) -> Self {
        Self::TrimProcessing(message.into())
    }

    pub fn encode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ExportEncode {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Show metadata lookup errors.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// No row matches the show tag
    #[error("No metadata found for show tag '{0}'")]
    NotFound(String),

    /// More than one row matches the show tag
    #[error("Ambiguous metadata for show tag '{tag}': {count} matching rows")]
    Ambiguous { tag: String, count: usize },

    /// The backing store could not be read
    #[error("Metadata source error: {0}")]
    Source(String),
}

/// Source filename does not follow the configured naming convention.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilenameParseError {
    #[error("'{filename}' has no {field} field")]
    MissingField {
        filename: String,
        field: &'static str,
    },

    #[error("'{filename}' has an invalid date '{date}'")]
    InvalidDate { filename: String, date: String },
}

/// ID3 tagging errors.
#[derive(Debug, thiserror::Error)]
pub enum TagWriteError {
    #[error("Failed to open {path} for tagging: {message}")]
    Open { path: PathBuf, message: String },

    #[error("{path} is not an MP3 file (detected {detected})")]
    NotMp3 { path: PathBuf, detected: String },

    #[error("Failed to save tags to {path}: {message}")]
    Save { path: PathBuf, message: String },
}

/// Export could not produce any destination file.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Fallback copy {source_path} -> {destination} failed: {error}")]
    FallbackCopy {
        source_path: PathBuf,
        destination: PathBuf,
        error: std::io::Error,
    },

    /// The destination was written; only the source cleanup failed
    #[error("Failed to remove consumed source {path}: {error}")]
    RemoveSource {
        path: PathBuf,
        error: std::io::Error,
        outcome: crate::export::ExportOutcome,
    },
}
