//! Show metadata lookup.
//!
//! Every backing store (spreadsheet export, SQLite table, in-memory rows)
//! implements [`MetadataSource`]; [`resolve`] turns its rows for a show tag
//! into exactly one [`ShowMetadata`] or a [`MetadataError`].

pub mod sheet;
pub mod sqlite;

pub use sheet::SheetTable;
pub use sqlite::SqliteMetadataSource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::MetadataError;

/// Episode number as recorded by the source.
///
/// Spreadsheets hand back numbers, SQL rows sometimes text; the textual
/// form is kept so the filename shows exactly what the source holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeNumber(String);

impl EpisodeNumber {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value for the ID3 track frame, if the episode is a number.
    pub fn as_track_number(&self) -> Option<u32> {
        self.0.parse().ok()
    }
}

impl From<i64> for EpisodeNumber {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl fmt::Display for EpisodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Descriptive data for one recurring show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowMetadata {
    pub show_name: String,
    /// May be empty; see [`ShowMetadata::artist`]
    pub dj_name: String,
    pub episode_number: EpisodeNumber,
    pub genre: String,
}

impl ShowMetadata {
    /// DJ name, or the show name when no DJ is listed.
    pub fn artist(&self) -> &str {
        if self.dj_name.trim().is_empty() {
            &self.show_name
        } else {
            &self.dj_name
        }
    }
}

/// How to treat a tag that matches more than one row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmbiguityPolicy {
    /// Fail with [`MetadataError::Ambiguous`]
    #[default]
    Reject,
    /// Take the first row in source order (logged as a warning)
    First,
}

/// Capability shared by all metadata backends.
///
/// Implement this trait to create mock implementations for testing.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// All rows whose show tag equals `tag`, in source order.
    async fn lookup(&self, tag: &str) -> Result<Vec<ShowMetadata>, MetadataError>;
}

/// Resolves a show tag to a single metadata record.
pub async fn resolve(
    tag: &str,
    source: &dyn MetadataSource,
    policy: AmbiguityPolicy,
) -> Result<ShowMetadata, MetadataError> {
    let mut rows = source.lookup(tag).await?;

    match (rows.len(), policy) {
        (0, _) => Err(MetadataError::NotFound(tag.to_string())),
        (1, _) => Ok(rows.remove(0)),
        (count, AmbiguityPolicy::Reject) => Err(MetadataError::Ambiguous {
            tag: tag.to_string(),
            count,
        }),
        (count, AmbiguityPolicy::First) => {
            tracing::warn!(tag, count, "Multiple metadata rows for show tag, using the first");
            Ok(rows.remove(0))
        }
    }
}
