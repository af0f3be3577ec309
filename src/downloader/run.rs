//! The sequential run loop.

use crate::auth::{self, HttpHeaders};
use crate::db::NewHistoryEntry;
use crate::error::{QueueError, Result};
use crate::types::{Event, ItemId, ItemStatus, MediaMetadata, QueueItem, RunSummary};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{ActiveItem, QueueManager};

/// Clears the running flag when the run ends, however it ends
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// How one item ended
enum ItemOutcome {
    Completed(MediaMetadata),
    Failed(String),
    Skipped,
}

impl QueueManager {
    /// Process the queue's pending items one at a time, in enqueue order
    ///
    /// The items that are `Pending` when the run starts make up the run; items
    /// enqueued while it is in progress wait for the next run. Every item in
    /// the run ends `Completed`, `Failed` or `Skipped`, except that after
    /// [`QueueManager::cancel`] the remaining ones are left `Pending`. A
    /// failed item never stops the run.
    ///
    /// Returns the run's outcome counters, which are also published as
    /// [`Event::RunFinished`].
    ///
    /// # Errors
    ///
    /// - [`QueueError::AlreadyRunning`] if another run is in progress
    /// - [`QueueError::EmptyQueue`] if no item is `Pending`
    pub async fn run(&self) -> Result<RunSummary> {
        // The flag is only set under the items lock, so clear() and
        // abandon_pending() cannot change the run's items once it has them
        let items = self.queue_state.items.lock().await;
        if self
            .queue_state
            .is_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(QueueError::AlreadyRunning.into());
        }
        let guard = RunningGuard(Arc::clone(&self.queue_state.is_running));

        let run_items: Vec<ItemId> = items
            .iter()
            .filter(|item| item.status == ItemStatus::Pending)
            .map(|item| item.id)
            .collect();
        drop(items);

        if run_items.is_empty() {
            return Err(QueueError::EmptyQueue.into());
        }

        self.queue_state
            .cancel_requested
            .store(false, Ordering::SeqCst);

        let total = run_items.len();
        tracing::info!(total, engine = self.engine_name(), "queue run started");
        self.emit_event(Event::RunStarted { pending: total });

        // Cookie-file headers are read once per run, not per item
        let cookie_headers = auth::load_cookie_headers(&self.config.authentication).await;

        let mut summary = RunSummary::default();

        for (index, id) in run_items.iter().copied().enumerate() {
            if self.is_cancel_requested() {
                summary.cancelled = true;
                summary.cancelled_remaining = total - index;
                tracing::info!(
                    remaining = summary.cancelled_remaining,
                    "queue run cancelled"
                );
                break;
            }

            let Some(item) = self.transition(id, ItemStatus::Downloading).await else {
                let reason = "item could not be started from its current status".to_string();
                tracing::warn!(item_id = id.0, "run item no longer startable");
                summary.failed += 1;
                self.emit_event(Event::ItemFailed { id, error: reason });
                continue;
            };

            let skip = CancellationToken::new();
            *self.queue_state.active.lock().await = Some(ActiveItem {
                id,
                skip: skip.clone(),
            });

            self.emit_event(Event::ItemStarted {
                id,
                position: index + 1,
                total,
                title: item.title.clone(),
            });
            tracing::info!(item_id = id.0, position = index + 1, total, title = %item.title, "item started");

            let result = self.process_item(&item, cookie_headers.as_ref(), &skip).await;

            // skip() holds this lock while it cancels, so once the slot is
            // empty the token can no longer change
            *self.queue_state.active.lock().await = None;

            // A skip wins over whatever the engine produced
            let outcome = if skip.is_cancelled() {
                ItemOutcome::Skipped
            } else {
                match result {
                    Ok(metadata) => ItemOutcome::Completed(metadata),
                    Err(reason) => ItemOutcome::Failed(reason),
                }
            };

            self.finish_item(&item, outcome, &mut summary).await;
        }

        drop(guard);

        tracing::info!(
            completed = summary.completed,
            failed = summary.failed,
            skipped = summary.skipped,
            cancelled = summary.cancelled,
            "queue run finished"
        );
        self.emit_event(Event::RunFinished {
            summary: summary.clone(),
        });

        Ok(summary)
    }

    /// Run the queue on a background task
    ///
    /// The returned handle resolves to the same result [`QueueManager::run`]
    /// would return.
    pub fn spawn_run(&self) -> JoinHandle<Result<RunSummary>> {
        let manager = self.clone();
        tokio::spawn(async move { manager.run().await })
    }

    /// Resolve parameters, prepare the destination and execute one item
    async fn process_item(
        &self,
        item: &QueueItem,
        cookie_headers: Option<&HttpHeaders>,
        skip: &CancellationToken,
    ) -> std::result::Result<MediaMetadata, String> {
        let params = self
            .resolver
            .resolve(&item.url, &item.selection, cookie_headers);

        match tokio::fs::create_dir_all(&params.save_dir).await {
            Ok(()) => self
                .executor
                .execute(item.id, params, skip)
                .await
                .map_err(|failure| failure.message),
            Err(e) => Err(format!(
                "failed to create save directory {}: {e}",
                params.save_dir.display()
            )),
        }
    }

    /// Apply an item's final status, record history and publish the result
    async fn finish_item(&self, item: &QueueItem, outcome: ItemOutcome, summary: &mut RunSummary) {
        let id = item.id;

        match outcome {
            ItemOutcome::Completed(metadata) => {
                self.transition(id, ItemStatus::Completed).await;
                summary.completed += 1;

                let entry = NewHistoryEntry::from_metadata(
                    &metadata,
                    &item.title,
                    &item.url,
                    chrono::Utc::now().timestamp(),
                );
                // The item stays Completed even if the record cannot be written
                if let Err(e) = self.history.record(&entry).await {
                    tracing::warn!(item_id = id.0, error = %e, "failed to record history");
                }

                tracing::info!(item_id = id.0, file = ?metadata.filepath, "item completed");
                self.emit_event(Event::ItemCompleted {
                    id,
                    file_path: metadata.filepath,
                });
            }
            ItemOutcome::Failed(reason) => {
                self.transition(
                    id,
                    ItemStatus::Failed {
                        reason: reason.clone(),
                    },
                )
                .await;
                summary.failed += 1;

                tracing::warn!(item_id = id.0, error = %reason, "item failed");
                self.emit_event(Event::ItemFailed { id, error: reason });
            }
            ItemOutcome::Skipped => {
                self.transition(id, ItemStatus::Skipped).await;
                summary.skipped += 1;

                tracing::info!(item_id = id.0, "item skipped");
                self.emit_event(Event::ItemSkipped { id });
            }
        }
    }
}
