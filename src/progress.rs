//! Progress normalization
//!
//! [`ProgressAggregator`] turns the engine's two independent event kinds into
//! one [`ProgressUpdate`] stream per item. Updates are forwarded in arrival
//! order with no throttling, coalescing or monotonicity correction; a
//! consumer that wants fewer updates coalesces them itself.
//!
//! The aggregator also keeps the live [`DownloadSession`] current. The session
//! slot is shared with the queue so callers can snapshot it, and there is only
//! ever one slot, so at most one session exists at a time.

use crate::engine::{
    EngineEvent, PostProcessEvent, PostProcessPhase, TransferEvent, TransferPhase,
};
use crate::resolver::EngineParams;
use crate::types::{Event, ItemId, PhaseLabel, ProgressUpdate};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Coarse phase of the active download
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Bytes are being transferred
    Downloading,
    /// Transfer done, post-processing stages running
    PostProcessing,
    /// The engine call returned
    Finished,
}

/// Live state of the item currently being executed
#[derive(Clone, Debug, Serialize)]
pub struct DownloadSession {
    /// Item being executed
    pub item_id: ItemId,
    /// Coarse phase
    pub phase: SessionPhase,
    /// Current display phase
    pub label: PhaseLabel,
    /// Last known fraction (`None` = indeterminate)
    pub fraction: Option<f32>,
    /// Last known transferred bytes
    pub downloaded_bytes: Option<u64>,
    /// Last known total bytes
    pub total_bytes: Option<u64>,
    /// 1 for the primary attempt, 2 for the fallback retry
    pub attempt: u32,
    /// Parameters of the current attempt
    pub params: EngineParams,
}

impl DownloadSession {
    /// Fresh session for an item about to start
    pub fn new(item_id: ItemId, params: EngineParams) -> Self {
        Self {
            item_id,
            phase: SessionPhase::Downloading,
            label: PhaseLabel::Downloading,
            fraction: None,
            downloaded_bytes: None,
            total_bytes: None,
            attempt: 1,
            params,
        }
    }
}

/// Shared slot holding the live session, if any
pub type SessionSlot = Arc<Mutex<Option<DownloadSession>>>;

/// Normalizes engine events for one item and forwards them as [`Event::Progress`]
#[derive(Debug)]
pub struct ProgressAggregator {
    id: ItemId,
    label: PhaseLabel,
    fraction: Option<f32>,
    downloaded_bytes: Option<u64>,
    total_bytes: Option<u64>,
    updates: mpsc::UnboundedSender<Event>,
    session: SessionSlot,
}

impl ProgressAggregator {
    /// Create an aggregator for one item
    pub fn new(id: ItemId, updates: mpsc::UnboundedSender<Event>, session: SessionSlot) -> Self {
        Self {
            id,
            label: PhaseLabel::Downloading,
            fraction: None,
            downloaded_bytes: None,
            total_bytes: None,
            updates,
            session,
        }
    }

    /// Map one engine event to a normalized update
    ///
    /// - transfer `downloading` with a known total: fraction = downloaded / total
    /// - transfer `downloading` without a total: indeterminate
    /// - transfer `finished`: fraction 1.0, "post-processing pending"
    /// - post-process `started`/`processing`: stage name, fraction unchanged
    /// - post-process `finished`: "complete", fraction 1.0
    pub fn normalize(&mut self, event: &EngineEvent) -> ProgressUpdate {
        let mut speed_bps = None;
        let mut eta_secs = None;

        match event {
            EngineEvent::Transfer(TransferEvent {
                phase,
                total_bytes,
                downloaded_bytes,
                speed_bps: speed,
                eta_secs: eta,
            }) => {
                self.total_bytes = *total_bytes;
                self.downloaded_bytes = *downloaded_bytes;
                speed_bps = *speed;
                eta_secs = *eta;

                match phase {
                    TransferPhase::Downloading => {
                        self.label = PhaseLabel::Downloading;
                        self.fraction = match (downloaded_bytes, total_bytes) {
                            (Some(done), Some(total)) if *total > 0 => {
                                Some(*done as f32 / *total as f32)
                            }
                            _ => None,
                        };
                    }
                    TransferPhase::Finished => {
                        self.label = PhaseLabel::PostProcessingPending;
                        self.fraction = Some(1.0);
                    }
                }
            }
            EngineEvent::PostProcess(PostProcessEvent { phase, stage }) => match phase {
                PostProcessPhase::Started | PostProcessPhase::Processing => {
                    self.label = PhaseLabel::Stage(stage.clone());
                }
                PostProcessPhase::Finished => {
                    self.label = PhaseLabel::Complete;
                    self.fraction = Some(1.0);
                }
            },
        }

        ProgressUpdate {
            id: self.id,
            phase: self.label.clone(),
            fraction: self.fraction,
            downloaded_bytes: self.downloaded_bytes,
            total_bytes: self.total_bytes,
            speed_bps,
            eta_secs,
        }
    }

    /// Normalize an event, update the live session and push the update
    pub async fn handle(&mut self, event: EngineEvent) -> ProgressUpdate {
        let update = self.normalize(&event);

        if let Some(session) = self.session.lock().await.as_mut()
            && session.item_id == self.id
        {
            session.phase = match update.phase {
                PhaseLabel::Downloading => SessionPhase::Downloading,
                _ => SessionPhase::PostProcessing,
            };
            session.label = update.phase.clone();
            session.fraction = update.fraction;
            session.downloaded_bytes = update.downloaded_bytes;
            session.total_bytes = update.total_bytes;
        }

        tracing::trace!(
            item_id = self.id.0,
            phase = update.phase.label(),
            fraction = ?update.fraction,
            "progress"
        );
        // Ignore send errors - the consumer may have dropped the stream
        let _ = self.updates.send(Event::Progress(update.clone()));
        update
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::resolver::ConfigResolver;
    use crate::types::ItemSelection;

    fn aggregator() -> (ProgressAggregator, mpsc::UnboundedReceiver<Event>, SessionSlot) {
        let (tx, rx) = mpsc::unbounded_channel();
        let slot: SessionSlot = Arc::new(Mutex::new(None));
        (ProgressAggregator::new(ItemId(1), tx, slot.clone()), rx, slot)
    }

    fn transfer(downloaded: u64, total: Option<u64>) -> EngineEvent {
        EngineEvent::Transfer(TransferEvent::downloading(downloaded, total))
    }

    fn stage(phase: PostProcessPhase, name: &str) -> EngineEvent {
        EngineEvent::PostProcess(PostProcessEvent::new(phase, name))
    }

    #[test]
    fn test_known_total_yields_fraction() {
        let (mut agg, _rx, _slot) = aggregator();
        let update = agg.normalize(&transfer(250, Some(1000)));

        assert_eq!(update.phase, PhaseLabel::Downloading);
        assert_eq!(update.fraction, Some(0.25));
        assert_eq!(update.downloaded_bytes, Some(250));
        assert_eq!(update.total_bytes, Some(1000));
    }

    #[test]
    fn test_unknown_or_zero_total_is_indeterminate() {
        let (mut agg, _rx, _slot) = aggregator();
        assert_eq!(agg.normalize(&transfer(250, None)).fraction, None);
        assert_eq!(agg.normalize(&transfer(250, Some(0))).fraction, None);
    }

    #[test]
    fn test_full_lifecycle_mapping() {
        let (mut agg, _rx, _slot) = aggregator();

        agg.normalize(&transfer(500, Some(1000)));
        let finished = agg.normalize(&EngineEvent::Transfer(TransferEvent::finished(Some(1000))));
        assert_eq!(finished.phase, PhaseLabel::PostProcessingPending);
        assert_eq!(finished.phase.label(), "post-processing pending");
        assert_eq!(finished.fraction, Some(1.0));

        let merging = agg.normalize(&stage(PostProcessPhase::Started, "Merger"));
        assert_eq!(merging.phase, PhaseLabel::Stage("Merger".into()));
        assert_eq!(merging.fraction, Some(1.0));

        let processing = agg.normalize(&stage(PostProcessPhase::Processing, "EmbedThumbnail"));
        assert_eq!(processing.phase.label(), "EmbedThumbnail");

        let done = agg.normalize(&stage(PostProcessPhase::Finished, "EmbedThumbnail"));
        assert_eq!(done.phase, PhaseLabel::Complete);
        assert_eq!(done.phase.label(), "complete");
        assert_eq!(done.fraction, Some(1.0));
    }

    #[test]
    fn test_stage_keeps_indeterminate_fraction() {
        let (mut agg, _rx, _slot) = aggregator();
        agg.normalize(&transfer(10, None));
        let update = agg.normalize(&stage(PostProcessPhase::Started, "FFmpegExtractAudio"));
        assert_eq!(update.fraction, None);
    }

    #[test]
    fn test_no_monotonicity_correction() {
        let (mut agg, _rx, _slot) = aggregator();
        assert_eq!(agg.normalize(&transfer(800, Some(1000))).fraction, Some(0.8));
        // A second stream (audio after video) starts over from zero
        assert_eq!(agg.normalize(&transfer(100, Some(1000))).fraction, Some(0.1));
    }

    #[tokio::test]
    async fn test_handle_forwards_in_order_and_updates_session() {
        let (mut agg, mut rx, slot) = aggregator();
        let params = ConfigResolver::new(Arc::new(Config::default())).resolve(
            "https://example.com/v",
            &ItemSelection::default(),
            None,
        );
        *slot.lock().await = Some(DownloadSession::new(ItemId(1), params));

        agg.handle(transfer(1, Some(4))).await;
        agg.handle(transfer(2, Some(4))).await;
        agg.handle(stage(PostProcessPhase::Started, "Merger")).await;

        let mut fractions = Vec::new();
        while let Ok(Event::Progress(update)) = rx.try_recv() {
            fractions.push((update.phase.label().to_string(), update.fraction));
        }
        assert_eq!(
            fractions,
            vec![
                ("downloading".to_string(), Some(0.25)),
                ("downloading".to_string(), Some(0.5)),
                ("Merger".to_string(), Some(0.5)),
            ]
        );

        let session = slot.lock().await.clone().unwrap();
        assert_eq!(session.phase, SessionPhase::PostProcessing);
        assert_eq!(session.label, PhaseLabel::Stage("Merger".into()));
        assert_eq!(session.downloaded_bytes, Some(2));
    }

    #[tokio::test]
    async fn test_handle_tolerates_dropped_consumer() {
        let (mut agg, rx, _slot) = aggregator();
        drop(rx);
        let update = agg.handle(transfer(5, Some(10))).await;
        assert_eq!(update.fraction, Some(0.5));
    }
}
