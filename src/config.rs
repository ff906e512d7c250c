//! Configuration system using TOML files.
//!
//! Config is read from `--config <path>` or the OS-standard config directory:
//! - Linux: ~/.config/show-trimmer/config.toml
//! - macOS: ~/Library/Application Support/show-trimmer/config.toml
//! - Windows: %APPDATA%\show-trimmer\config.toml
//!
//! Every section has defaults, so a partial file (or none) is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::audio::TrimSettings;
use crate::metadata::AmbiguityPolicy;
use crate::naming::NamingConvention;

/// Subdirectory of the root holding recordings waiting to be processed.
pub const SOURCE_SUBDIR: &str = "to_mix";
/// Subdirectory of the root receiving exported MP3s.
pub const DESTINATION_SUBDIR: &str = "to_upload";
/// Longest accepted fade-in/fade-out (10 minutes).
pub const MAX_FADE_MS: u64 = 600_000;
/// Longest accepted silence detection chunk.
pub const MAX_CHUNK_MS: u64 = 10_000;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub metadata: MetadataConfig,
    pub audio: AudioConfig,
    pub naming: NamingConfig,
}

/// Where recordings are picked up and dropped off
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root holding `to_mix/` and `to_upload/`
    pub root: PathBuf,
    /// Explicit source directory (overrides `root/to_mix`)
    pub source_dir: Option<PathBuf>,
    /// Explicit destination directory (overrides `root/to_upload`)
    pub destination_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/var/lib/robot"),
            source_dir: None,
            destination_dir: None,
        }
    }
}

impl PathsConfig {
    pub fn source_dir(&self) -> PathBuf {
        self.source_dir
            .clone()
            .unwrap_or_else(|| self.root.join(SOURCE_SUBDIR))
    }

    pub fn destination_dir(&self) -> PathBuf {
        self.destination_dir
            .clone()
            .unwrap_or_else(|| self.root.join(DESTINATION_SUBDIR))
    }
}

/// Which backing store holds show metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataBackend {
    /// JSON records exported from the show spreadsheet
    #[default]
    Sheet,
    /// `base_data` table in a SQLite database
    Sqlite,
}

/// Metadata source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub backend: MetadataBackend,
    pub sheet_path: PathBuf,
    pub database_url: String,
    pub on_ambiguous: AmbiguityPolicy,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            backend: MetadataBackend::Sheet,
            sheet_path: PathBuf::from("/etc/robot/meta.json"),
            database_url: "sqlite:/etc/robot/base_data.db".to_string(),
            on_ambiguous: AmbiguityPolicy::Reject,
        }
    }
}

/// Trimming and export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub fade_duration_ms: u64,
    pub export_bitrate_kbps: u32,
    pub silence_threshold_dbfs: f32,
    pub chunk_ms: u64,
    /// ffmpeg binary (looked up on PATH when not absolute)
    pub ffmpeg_path: PathBuf,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            fade_duration_ms: 3000,
            export_bitrate_kbps: 320,
            silence_threshold_dbfs: -50.0,
            chunk_ms: 10,
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}

impl AudioConfig {
    pub fn trim_settings(&self) -> TrimSettings {
        TrimSettings {
            silence_threshold_dbfs: self.silence_threshold_dbfs,
            chunk_ms: self.chunk_ms,
            fade_ms: self.fade_duration_ms,
        }
    }
}

/// Source filename convention
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    pub convention: NamingConvention,
}

impl Config {
    /// Rejects settings that would make every file fall back.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audio.export_bitrate_kbps == 0 {
            return Err(ConfigError::Invalid("export_bitrate_kbps must be > 0".into()));
        }
        if self.audio.chunk_ms == 0 || self.audio.chunk_ms > MAX_CHUNK_MS {
            return Err(ConfigError::Invalid(format!(
                "chunk_ms must be between 1 and {}",
                MAX_CHUNK_MS
            )));
        }
        if self.audio.fade_duration_ms > MAX_FADE_MS {
            return Err(ConfigError::Invalid(format!(
                "fade_duration_ms must be at most {}",
                MAX_FADE_MS
            )));
        }
        if !(self.audio.silence_threshold_dbfs <= 0.0) {
            return Err(ConfigError::Invalid(
                "silence_threshold_dbfs must be <= 0".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("show-trimmer"))
}

/// Get the full path to the default config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from `path`, or the default location.
///
/// Returns default config if the file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load(path: Option<&Path>) -> Config {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_path) else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Tests
// ============================================================================
