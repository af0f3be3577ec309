//! Queue contents: enqueue, clear, inspection.

use crate::error::{Error, QueueError, Result};
use crate::progress::DownloadSession;
use crate::types::{Event, ItemId, ItemStatus, NewItem, QueueItem};
use std::sync::atomic::Ordering;

use super::QueueManager;

/// Trim `raw` and require it to be an absolute URL
pub(crate) fn checked_url(raw: &str) -> Result<&str> {
    let url = raw.trim();
    url::Url::parse(url).map_err(|e| Error::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    Ok(url)
}

impl QueueManager {
    /// Append an item to the end of the queue
    ///
    /// The item starts out `Pending`. Enqueueing never starts a run; call
    /// [`QueueManager::run`] for that. Items may be enqueued while a run is in
    /// progress, in which case they wait for the next run.
    ///
    /// A blank title is replaced by the URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `item.url` is not an absolute URL.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use media_dl::*;
    /// # async fn example(manager: QueueManager) -> Result<()> {
    /// let id = manager
    ///     .enqueue(NewItem::new("Talk", "https://www.youtube.com/watch?v=dQw4w9WgXcQ"))
    ///     .await?;
    /// println!("queued as {id}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn enqueue(&self, item: NewItem) -> Result<ItemId> {
        let url = checked_url(&item.url)?;

        let title = if item.title.trim().is_empty() {
            url.to_string()
        } else {
            item.title
        };

        let id = ItemId(self.queue_state.next_id.fetch_add(1, Ordering::SeqCst));
        let queued = QueueItem {
            id,
            title: title.clone(),
            url: url.to_string(),
            selection: item.selection,
            duration_secs: item.duration_secs,
            status: ItemStatus::Pending,
        };

        self.queue_state.items.lock().await.push(queued);

        tracing::debug!(item_id = id.0, url = %url, "item queued");
        self.emit_event(Event::Queued { id, title });

        Ok(id)
    }

    /// Remove every item from the queue
    ///
    /// Returns the number of items removed.
    ///
    /// # Errors
    ///
    /// - [`QueueError::AlreadyRunning`] while a run is in progress
    /// - [`QueueError::EmptyQueue`] if there is nothing to remove
    pub async fn clear(&self) -> Result<usize> {
        // run() only sets the flag while holding this lock
        let mut items = self.queue_state.items.lock().await;
        if self.is_running() {
            return Err(QueueError::AlreadyRunning.into());
        }
        if items.is_empty() {
            return Err(QueueError::EmptyQueue.into());
        }

        let removed = items.len();
        items.clear();
        drop(items);

        tracing::info!(removed, "queue cleared");
        self.emit_event(Event::QueueCleared { removed });

        Ok(removed)
    }

    /// Mark every `Pending` item `Cancelled`
    ///
    /// This is how a UI discards the leftovers of a cancelled run instead of
    /// keeping them for the next one. Returns the number of items affected.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::AlreadyRunning`] while a run is in progress.
    pub async fn abandon_pending(&self) -> Result<usize> {
        let mut items = self.queue_state.items.lock().await;
        if self.is_running() {
            return Err(QueueError::AlreadyRunning.into());
        }

        let mut count = 0;
        for item in items.iter_mut() {
            if item.status == ItemStatus::Pending {
                item.status = ItemStatus::Cancelled;
                count += 1;
            }
        }
        drop(items);

        if count > 0 {
            tracing::info!(count, "pending items abandoned");
            self.emit_event(Event::PendingAbandoned { count });
        }

        Ok(count)
    }

    /// Snapshot of the queue in enqueue order
    pub async fn items(&self) -> Vec<QueueItem> {
        self.queue_state.items.lock().await.clone()
    }

    /// Snapshot of one item
    pub async fn item(&self, id: ItemId) -> Option<QueueItem> {
        self.queue_state
            .items
            .lock()
            .await
            .iter()
            .find(|item| item.id == id)
            .cloned()
    }

    /// Number of items in the queue, in any status
    pub async fn len(&self) -> usize {
        self.queue_state.items.lock().await.len()
    }

    /// Whether the queue holds no items at all
    pub async fn is_empty(&self) -> bool {
        self.queue_state.items.lock().await.is_empty()
    }

    /// Number of items still waiting to be processed
    pub async fn pending_count(&self) -> usize {
        self.queue_state
            .items
            .lock()
            .await
            .iter()
            .filter(|item| item.status == ItemStatus::Pending)
            .count()
    }

    /// Whether a run is in progress
    pub fn is_running(&self) -> bool {
        self.queue_state.is_running.load(Ordering::SeqCst)
    }

    /// Snapshot of the live session, if an item is executing
    pub async fn active_session(&self) -> Option<DownloadSession> {
        self.session.lock().await.clone()
    }

    /// Move an item to a new status, enforcing the allowed transitions
    ///
    /// Returns the updated item, or `None` if the item is gone or the
    /// transition is not allowed from its current status.
    pub(crate) async fn transition(&self, id: ItemId, next: ItemStatus) -> Option<QueueItem> {
        let mut items = self.queue_state.items.lock().await;
        let item = items.iter_mut().find(|item| item.id == id)?;

        if !item.status.can_transition_to(&next) {
            tracing::error!(
                item_id = id.0,
                from = %item.status,
                to = %next,
                "rejected item status transition"
            );
            return None;
        }

        item.status = next;
        Some(item.clone())
    }
}
