//! History management operations.

use crate::types::HistoryEntry;
use crate::{Error, Result};

use super::{Database, HistoryRow, NewHistoryEntry};

impl Database {
    /// Insert a history record, replacing any record with the same content id
    ///
    /// The replacement happens in place: the record count is unchanged when
    /// the same content is downloaded again.
    pub async fn upsert_history(&self, entry: &NewHistoryEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO history (
                content_id, title, url, uploader, duration_secs, format,
                resolution, file_path, file_size, downloaded_at, status
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(content_id) DO UPDATE SET
                title = excluded.title,
                url = excluded.url,
                uploader = excluded.uploader,
                duration_secs = excluded.duration_secs,
                format = excluded.format,
                resolution = excluded.resolution,
                file_path = excluded.file_path,
                file_size = excluded.file_size,
                downloaded_at = excluded.downloaded_at,
                status = excluded.status
            "#,
        )
        .bind(&entry.content_id)
        .bind(&entry.title)
        .bind(&entry.url)
        .bind(&entry.uploader)
        .bind(entry.duration_secs)
        .bind(&entry.format)
        .bind(&entry.resolution)
        .bind(&entry.file_path)
        .bind(entry.file_size.map(|s| s as i64))
        .bind(entry.downloaded_at)
        .bind(&entry.status)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(())
    }

    /// Get a single history record by content id
    pub async fn get_history_entry(&self, content_id: &str) -> Result<Option<HistoryEntry>> {
        let row = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT content_id, title, url, uploader, duration_secs, format,
                   resolution, file_path, file_size, downloaded_at, status
            FROM history
            WHERE content_id = ?
            "#,
        )
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(row.map(HistoryEntry::from))
    }

    /// Query history with pagination
    ///
    /// Returns records ordered by download time (most recent first).
    pub async fn query_history(&self, limit: usize, offset: usize) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT content_id, title, url, uploader, duration_secs, format,
                   resolution, file_path, file_size, downloaded_at, status
            FROM history
            ORDER BY downloaded_at DESC, rowid DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(rows.into_iter().map(HistoryEntry::from).collect())
    }

    /// Count history records
    pub async fn count_history(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM history")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(count)
    }

    /// Delete one history record
    ///
    /// Returns `true` if a record was deleted.
    pub async fn delete_history_entry(&self, content_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM history WHERE content_id = ?")
            .bind(content_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete all history records
    ///
    /// Returns the number of records deleted.
    pub async fn clear_history(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM history")
            .execute(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(result.rows_affected())
    }
}
