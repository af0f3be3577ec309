//! Info probing and playlist expansion.

use crate::engine::{MediaInfo, PlaylistInfo};
use crate::error::{Error, Result};
use crate::types::{ItemId, ItemSelection, NewItem};

use super::QueueManager;
use super::queue::checked_url;

impl QueueManager {
    /// Describe a URL without downloading it
    ///
    /// Gives a UI the title, duration and available formats to offer before
    /// the item is queued.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidUrl`] for a malformed URL, otherwise the engine's
    /// classified failure.
    pub async fn probe(&self, url: &str) -> Result<MediaInfo> {
        let url = checked_url(url)?;
        Ok(self.engine.probe(url).await?)
    }

    /// Expand a playlist URL into its entries without downloading them
    pub async fn probe_playlist(&self, url: &str) -> Result<PlaylistInfo> {
        let url = checked_url(url)?;
        Ok(self.engine.probe_playlist(url).await?)
    }

    /// Queue every entry of a playlist with one shared selection
    ///
    /// Entries are appended in playlist order with the listed title and
    /// duration hint; the queue is never cleared first. Entries whose URL is
    /// not valid are skipped with a warning. Returns the ids of the queued
    /// items, which is empty for an empty playlist.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use media_dl::*;
    /// # async fn example(manager: QueueManager) -> Result<()> {
    /// let ids = manager
    ///     .enqueue_playlist(
    ///         "https://www.youtube.com/playlist?list=PL590L5WQmH8fJ54F369BLDSqIwcs-TCfs",
    ///         ItemSelection::audio_only("mp3"),
    ///     )
    ///     .await?;
    /// println!("queued {} items", ids.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn enqueue_playlist(&self, url: &str, selection: ItemSelection) -> Result<Vec<ItemId>> {
        let playlist = self.probe_playlist(url).await?;
        let mut ids = Vec::with_capacity(playlist.entries.len());

        for entry in playlist.entries {
            let mut item = NewItem::new(entry.title.clone(), entry.url.clone())
                .with_selection(selection.clone());
            if let Some(secs) = entry.duration_secs() {
                item = item.with_duration(secs);
            }

            match self.enqueue(item).await {
                Ok(id) => ids.push(id),
                Err(Error::InvalidUrl { url, reason }) => {
                    tracing::warn!(url = %url, reason = %reason, "skipping playlist entry");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(playlist = %playlist.title, queued = ids.len(), "playlist queued");
        Ok(ids)
    }
}
