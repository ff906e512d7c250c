//! In-memory metadata table, typically loaded from a spreadsheet export.
//!
//! The export is a JSON array of records, one object per sheet row keyed by
//! column header, e.g.:
//!
//! ```json
//! [{"tag": "NEON", "show_name": "Show Name", "dj_name": "", "show_nr": 12, "tags-0-tag": "House"}]
//! ```
//!
//! Columns other than `tag` and `show_name` are optional. Genre is read from
//! `genre`, falling back to the sheet's `tags-0-tag` column.

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

use super::{EpisodeNumber, MetadataSource, ShowMetadata};
use crate::error::MetadataError;

/// Column holding the show tag.
const TAG_COLUMN: &str = "tag";
const GENRE_COLUMNS: [&str; 2] = ["genre", "tags-0-tag"];

/// Rows keyed by show tag, kept in sheet order.
#[derive(Debug, Clone, Default)]
pub struct SheetTable {
    rows: Vec<(String, ShowMetadata)>,
}

impl SheetTable {
    pub fn from_rows(rows: Vec<(String, ShowMetadata)>) -> Self {
        Self { rows }
    }

    /// Parses a JSON records export.
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        let records: Vec<serde_json::Map<String, Value>> = serde_json::from_str(json)
            .map_err(|e| MetadataError::Source(format!("Invalid sheet export: {}", e)))?;

        let mut rows = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let Some(tag) = text(record.get(TAG_COLUMN)) else {
                tracing::debug!(row = index, "Skipping sheet row without a tag");
                continue;
            };

            let genre = GENRE_COLUMNS
                .iter()
                .find_map(|col| text(record.get(*col)))
                .unwrap_or_default();

            rows.push((
                tag,
                ShowMetadata {
                    show_name: text(record.get("show_name")).unwrap_or_default(),
                    dj_name: text(record.get("dj_name")).unwrap_or_default(),
                    episode_number: EpisodeNumber::new(
                        text(record.get("show_nr")).unwrap_or_default(),
                    ),
                    genre,
                },
            ));
        }

        Ok(Self { rows })
    }

    /// Loads a JSON records export from disk.
    pub fn load(path: &Path) -> Result<Self, MetadataError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            MetadataError::Source(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let table = Self::from_json(&contents)?;
        tracing::info!(path = %path.display(), rows = table.len(), "Loaded metadata sheet");
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl MetadataSource for SheetTable {
    async fn lookup(&self, tag: &str) -> Result<Vec<ShowMetadata>, MetadataError> {
        Ok(self
            .rows
            .iter()
            .filter(|(row_tag, _)| row_tag == tag)
            .map(|(_, meta)| meta.clone())
            .collect())
    }
}

/// Cell text; empty cells and nulls count as absent.
fn text(value: Option<&Value>) -> Option<String> {
    let s = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => match n.as_f64() {
            // Sheets hand integers back as floats sometimes
            Some(f) if f.fract() == 0.0 && n.is_f64() => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}
