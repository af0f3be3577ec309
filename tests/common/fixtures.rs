//! Engine doubles and sample content

use async_trait::async_trait;
use media_dl::engine::{Engine, EngineEvent, EventSink, PostProcessEvent, PostProcessPhase, TransferEvent};
use media_dl::{EngineError, EngineParams, MediaMetadata};
use std::collections::HashMap;
use std::sync::Mutex;

/// Watch URL for a short id
pub fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

/// Error yt-dlp reports when browser cookies cannot be decrypted
pub fn cookie_decryption_error() -> EngineError {
    EngineError::AuthDecryption {
        message: "ERROR: Failed to decrypt with DPAPI".to_string(),
    }
}

/// Engine that reports a full progress lifecycle and succeeds, unless a URL
/// has failures queued for it
#[derive(Default)]
pub struct FakeEngine {
    failures: Mutex<HashMap<String, Vec<EngineError>>>,
    calls: Mutex<Vec<EngineParams>>,
}

impl FakeEngine {
    /// Engine that succeeds for every URL
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next invocations for `url` with these errors, in order
    pub fn failing(self, url: &str, errors: Vec<EngineError>) -> Self {
        let mut errors = errors;
        errors.reverse();
        self.failures
            .lock()
            .unwrap()
            .insert(url.to_string(), errors);
        self
    }

    /// Parameters of every invocation so far
    pub fn calls(&self) -> Vec<EngineParams> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Engine for FakeEngine {
    async fn download(
        &self,
        params: &EngineParams,
        events: EventSink,
    ) -> Result<MediaMetadata, EngineError> {
        self.calls.lock().unwrap().push(params.clone());

        let failure = self
            .failures
            .lock()
            .unwrap()
            .get_mut(&params.url)
            .and_then(|errors| errors.pop());
        if let Some(error) = failure {
            return Err(error);
        }

        for event in lifecycle_events() {
            events.send(event).ok();
        }

        let id = params.url.rsplit('=').next().unwrap_or_default().to_string();
        Ok(MediaMetadata {
            title: Some(format!("Video {id}")),
            webpage_url: Some(params.url.clone()),
            uploader: Some("Fake Channel".to_string()),
            duration: Some(60.0),
            filepath: Some(
                params
                    .save_dir
                    .join(format!("{id}.mp4"))
                    .display()
                    .to_string(),
            ),
            filesize: Some(4 * 1024 * 1024),
            id: Some(id),
            ..Default::default()
        })
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Transfer progress, then merge and thumbnail post-processing
pub fn lifecycle_events() -> Vec<EngineEvent> {
    vec![
        EngineEvent::Transfer(TransferEvent::downloading(0, Some(4 * 1024 * 1024))),
        EngineEvent::Transfer(TransferEvent::downloading(2 * 1024 * 1024, Some(4 * 1024 * 1024))),
        EngineEvent::Transfer(TransferEvent::finished(Some(4 * 1024 * 1024))),
        EngineEvent::PostProcess(PostProcessEvent::new(PostProcessPhase::Started, "Merger")),
        EngineEvent::PostProcess(PostProcessEvent::new(PostProcessPhase::Finished, "Merger")),
        EngineEvent::PostProcess(PostProcessEvent::new(
            PostProcessPhase::Started,
            "EmbedThumbnail",
        )),
        EngineEvent::PostProcess(PostProcessEvent::new(
            PostProcessPhase::Finished,
            "EmbedThumbnail",
        )),
    ]
}
