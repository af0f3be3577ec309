//! Download history queries.

use crate::error::Result;
use crate::types::HistoryEntry;

use super::QueueManager;

impl QueueManager {
    /// Get the history record for one piece of content
    pub async fn get_history_entry(&self, content_id: &str) -> Result<Option<HistoryEntry>> {
        self.db.get_history_entry(content_id).await
    }

    /// Query download history, most recent first
    pub async fn query_history(&self, limit: usize, offset: usize) -> Result<Vec<HistoryEntry>> {
        self.db.query_history(limit, offset).await
    }

    /// Count history records
    pub async fn count_history(&self) -> Result<i64> {
        self.db.count_history().await
    }

    /// Delete one history record
    ///
    /// Returns `true` if a record was deleted.
    pub async fn delete_history_entry(&self, content_id: &str) -> Result<bool> {
        self.db.delete_history_entry(content_id).await
    }

    /// Delete all history records
    ///
    /// Returns the number of records removed.
    pub async fn clear_history(&self) -> Result<u64> {
        let removed = self.db.clear_history().await?;
        tracing::info!(removed, "history cleared");
        Ok(removed)
    }
}
