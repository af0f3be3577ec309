//! Database layer for media-dl
//!
//! Handles SQLite persistence of the download history.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`history`] - Keyed history records (upsert, queries, deletion)
//!
//! The queue itself is never persisted; only completed downloads are.

use crate::types::{HistoryEntry, MediaMetadata};
use async_trait::async_trait;
use sqlx::{FromRow, sqlite::SqlitePool};

mod history;
mod migrations;

/// Status stored for successfully completed downloads
pub const STATUS_COMPLETED: &str = "completed";

/// History record to be written (insert or replace by `content_id`)
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryEntry {
    /// Stable content identifier (record key)
    pub content_id: String,
    /// Content title
    pub title: String,
    /// Source URL
    pub url: String,
    /// Uploader / channel name
    pub uploader: Option<String>,
    /// Duration in seconds
    pub duration_secs: Option<f64>,
    /// Engine format description
    pub format: Option<String>,
    /// Resolution description
    pub resolution: Option<String>,
    /// Final output path
    pub file_path: Option<String>,
    /// File size in bytes
    pub file_size: Option<u64>,
    /// Unix timestamp of the download
    pub downloaded_at: i64,
    /// Record status
    pub status: String,
}

impl NewHistoryEntry {
    /// Build a record from engine metadata, falling back to the queue item's
    /// own title and URL where the engine reported nothing
    pub fn from_metadata(
        metadata: &MediaMetadata,
        item_title: &str,
        item_url: &str,
        downloaded_at: i64,
    ) -> Self {
        Self {
            content_id: metadata.content_id(item_url),
            title: metadata
                .title
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| item_title.to_string()),
            url: metadata
                .webpage_url
                .clone()
                .unwrap_or_else(|| item_url.to_string()),
            uploader: metadata.uploader.clone(),
            duration_secs: metadata.duration,
            format: metadata.format.clone(),
            resolution: metadata.resolution.clone(),
            file_path: metadata.filepath.clone(),
            file_size: metadata.size_bytes(),
            downloaded_at,
            status: STATUS_COMPLETED.to_string(),
        }
    }
}

/// History record from database (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    /// Stable content identifier
    pub content_id: String,
    /// Content title
    pub title: String,
    /// Source URL
    pub url: String,
    /// Uploader / channel name
    pub uploader: Option<String>,
    /// Duration in seconds
    pub duration_secs: Option<f64>,
    /// Engine format description
    pub format: Option<String>,
    /// Resolution description
    pub resolution: Option<String>,
    /// Final output path
    pub file_path: Option<String>,
    /// File size in bytes
    pub file_size: Option<i64>,
    /// Unix timestamp of the download
    pub downloaded_at: i64,
    /// Record status
    pub status: String,
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        use chrono::{TimeZone, Utc};

        HistoryEntry {
            content_id: row.content_id,
            title: row.title,
            url: row.url,
            uploader: row.uploader,
            duration_secs: row.duration_secs,
            format: row.format,
            resolution: row.resolution,
            file_path: row.file_path,
            file_size: row.file_size.map(|s| s.max(0) as u64),
            downloaded_at: Utc
                .timestamp_opt(row.downloaded_at, 0)
                .single()
                .unwrap_or_else(Utc::now),
            status: row.status,
        }
    }
}

/// Append-or-overwrite store for completed downloads
///
/// Re-recording an existing `content_id` replaces the prior record, so the
/// record count never grows for repeated downloads of the same content.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Insert or replace the record keyed by `entry.content_id`
    async fn record(&self, entry: &NewHistoryEntry) -> crate::Result<()>;
}

#[async_trait]
impl HistoryStore for Database {
    async fn record(&self, entry: &NewHistoryEntry) -> crate::Result<()> {
        self.upsert_history(entry).await
    }
}

/// Database handle for media-dl
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
