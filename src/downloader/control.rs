//! Run control: cancel and skip.
//!
//! Both are cooperative. Neither interrupts the engine call that is already in
//! flight; they only change what happens once it returns.

use crate::types::{Event, ItemId};
use std::sync::atomic::Ordering;

use super::QueueManager;

impl QueueManager {
    /// Request that the current run stop
    ///
    /// The item currently executing runs to its own conclusion (its status is
    /// whatever the engine produces). No further items are started, and the
    /// remaining ones stay `Pending`. The request is forgotten when the next
    /// run starts.
    ///
    /// Returns `true` if a run was in progress to receive the request.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use media_dl::*;
    /// # async fn example(manager: QueueManager) -> Result<()> {
    /// let run = manager.spawn_run();
    /// manager.cancel();
    /// let summary = run.await.map_err(|e| Error::Other(e.to_string()))??;
    /// assert!(summary.cancelled);
    /// # Ok(())
    /// # }
    /// ```
    pub fn cancel(&self) -> bool {
        self.queue_state
            .cancel_requested
            .store(true, Ordering::SeqCst);

        let running = self.is_running();
        if running {
            tracing::info!("cancel requested; current item will finish first");
            self.emit_event(Event::CancelRequested);
        }
        running
    }

    /// Whether a cancel request is outstanding
    pub fn is_cancel_requested(&self) -> bool {
        self.queue_state.cancel_requested.load(Ordering::SeqCst)
    }

    /// Mark the currently executing item as skipped
    ///
    /// The engine call is not interrupted; when it returns the item ends up
    /// `Skipped` whatever the engine reported, no history is recorded for it,
    /// and no fallback retry is attempted. The run then continues with the
    /// next item.
    ///
    /// Returns the id of the item that will be skipped, or `None` if nothing
    /// is executing.
    pub async fn skip(&self) -> Option<ItemId> {
        let active = self.queue_state.active.lock().await;
        let active = active.as_ref()?;

        active.skip.cancel();
        tracing::info!(item_id = active.id.0, "skip requested");
        self.emit_event(Event::SkipRequested { id: active.id });

        Some(active.id)
    }
}
