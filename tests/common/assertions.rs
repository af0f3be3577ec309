//! Custom test assertions for integration tests

use futures::StreamExt;
use media_dl::{Event, ItemId, ItemStatus, QueueManager, RunSummary};
use std::time::Duration;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Collect events until a run finishes
///
/// Returns every event seen (the `RunFinished` event last) and the run
/// summary, or `None` on timeout or a closed stream.
pub async fn collect_until_run_finished(
    updates: &mut UnboundedReceiverStream<Event>,
    timeout: Duration,
) -> Option<(Vec<Event>, RunSummary)> {
    tokio::time::timeout(timeout, async {
        let mut events = Vec::new();
        while let Some(event) = updates.next().await {
            let finished = match &event {
                Event::RunFinished { summary } => Some(summary.clone()),
                _ => None,
            };
            events.push(event);
            if let Some(summary) = finished {
                return Some((events, summary));
            }
        }
        None
    })
    .await
    .ok()
    .flatten()
}

/// Assert an item's status
pub async fn assert_item_status(manager: &QueueManager, id: ItemId, expected: ItemStatus) {
    let item = manager
        .item(id)
        .await
        .unwrap_or_else(|| panic!("item {id} not in queue"));
    assert_eq!(item.status, expected, "unexpected status for item {id}");
}

/// Progress summary lines for one item, in order
pub fn progress_lines(events: &[Event], id: ItemId) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::Progress(update) if update.id == id => Some(update.summary_line()),
            _ => None,
        })
        .collect()
}
