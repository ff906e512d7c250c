//! SQLite-backed metadata source.
//!
//! Reads the `base_data` table maintained by the station's scheduling
//! tools. Only `TAG` and `show_name` are required; `dj_name`, `show_nr`
//! and `genre` are read when present.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use super::{EpisodeNumber, MetadataSource, ShowMetadata};
use crate::error::MetadataError;

const LOOKUP_QUERY: &str = "SELECT * FROM base_data WHERE TAG = ?";

/// Metadata source over an existing SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteMetadataSource {
    pool: SqlitePool,
}

impl SqliteMetadataSource {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to an existing database. The table is never created here.
    pub async fn connect(db_url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(db_url)
            .await?;
        tracing::info!(db = db_url, "Connected to metadata database");
        Ok(Self { pool })
    }
}

#[async_trait]
impl MetadataSource for SqliteMetadataSource {
    async fn lookup(&self, tag: &str) -> Result<Vec<ShowMetadata>, MetadataError> {
        let rows = sqlx::query(LOOKUP_QUERY)
            .bind(tag)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MetadataError::Source(e.to_string()))?;

        rows.iter().map(row_to_metadata).collect()
    }
}

fn row_to_metadata(row: &SqliteRow) -> Result<ShowMetadata, MetadataError> {
    let show_name = optional_text(row, "show_name")?
        .ok_or_else(|| MetadataError::Source("base_data row has no show_name".to_string()))?;

    Ok(ShowMetadata {
        show_name,
        dj_name: optional_text(row, "dj_name")?.unwrap_or_default(),
        episode_number: optional_episode(row)?.unwrap_or_default(),
        genre: optional_text(row, "genre")?.unwrap_or_default(),
    })
}

/// Text column that may be missing from the schema or NULL.
fn optional_text(row: &SqliteRow, column: &str) -> Result<Option<String>, MetadataError> {
    match row.try_get::<Option<String>, _>(column) {
        Ok(value) => Ok(value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())),
        Err(sqlx::Error::ColumnNotFound(_)) => Ok(None),
        Err(e) => Err(MetadataError::Source(format!("{}: {}", column, e))),
    }
}

/// `show_nr` is an INTEGER in most databases but TEXT in older ones.
fn optional_episode(row: &SqliteRow) -> Result<Option<EpisodeNumber>, MetadataError> {
    match row.try_get::<Option<i64>, _>("show_nr") {
        Ok(value) => Ok(value.map(EpisodeNumber::from)),
        Err(sqlx::Error::ColumnNotFound(_)) => Ok(None),
        Err(_) => Ok(optional_text(row, "show_nr")?.map(EpisodeNumber::new)),
    }
}
