//! Shared test helpers for creating QueueManager instances in tests.

use crate::config::Config;
use crate::db::{Database, HistoryStore, NewHistoryEntry};
use crate::downloader::QueueManager;
use crate::engine::{Engine, EngineEvent, EventSink, MediaInfo, PlaylistInfo, TransferEvent};
use crate::error::EngineError;
use crate::resolver::EngineParams;
use crate::types::{Event, MediaMetadata};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;
use tokio::sync::{Semaphore, mpsc};

/// What the scripted engine does for one invocation
#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// Return metadata derived from the URL
    Succeed,
    /// Return this error
    Fail(EngineError),
    /// Panic inside the engine task
    Panic,
}

/// Blocks each engine invocation until the test releases it
pub(crate) struct EngineGate {
    started: mpsc::UnboundedReceiver<String>,
    permits: Arc<Semaphore>,
}

impl EngineGate {
    /// Wait until an invocation has started; returns its URL
    pub(crate) async fn wait_started(&mut self) -> String {
        self.started.recv().await.unwrap()
    }

    /// Let one invocation finish
    pub(crate) fn release(&self) {
        self.permits.add_permits(1);
    }
}

/// Engine double: per-URL scripted outcomes, recorded parameters
pub(crate) struct ScriptedEngine {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<EngineParams>>,
    progress: Vec<EngineEvent>,
    gate: Option<(mpsc::UnboundedSender<String>, Arc<Semaphore>)>,
    infos: HashMap<String, MediaInfo>,
    playlists: HashMap<String, PlaylistInfo>,
}

impl ScriptedEngine {
    /// Engine that succeeds for every URL and reports no progress
    pub(crate) fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            progress: Vec::new(),
            gate: None,
            infos: HashMap::new(),
            playlists: HashMap::new(),
        }
    }

    /// Engine whose invocations block until released through the gate
    pub(crate) fn gated() -> (Self, EngineGate) {
        let (tx, rx) = mpsc::unbounded_channel();
        let permits = Arc::new(Semaphore::new(0));
        let engine = Self {
            gate: Some((tx, permits.clone())),
            ..Self::new()
        };
        (
            engine,
            EngineGate {
                started: rx,
                permits,
            },
        )
    }

    /// Script successive invocations for one URL (unscripted calls succeed)
    pub(crate) fn on(self, url: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), steps.into());
        self
    }

    /// Report these events on every invocation
    pub(crate) fn with_progress(mut self, events: Vec<EngineEvent>) -> Self {
        self.progress = events;
        self
    }

    /// Answer probes of `url` with `info` (unknown URLs fail)
    pub(crate) fn with_info(mut self, url: &str, info: MediaInfo) -> Self {
        self.infos.insert(url.to_string(), info);
        self
    }

    /// Answer playlist probes of `url` with `playlist` (unknown URLs fail)
    pub(crate) fn with_playlist(mut self, url: &str, playlist: PlaylistInfo) -> Self {
        self.playlists.insert(url.to_string(), playlist);
        self
    }

    /// Parameters of every invocation so far, in call order
    pub(crate) fn calls(&self) -> Vec<EngineParams> {
        self.calls.lock().unwrap().clone()
    }

    /// URLs of every invocation so far, in call order
    pub(crate) fn called_urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|p| p.url).collect()
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    async fn download(
        &self,
        params: &EngineParams,
        events: EventSink,
    ) -> Result<MediaMetadata, EngineError> {
        let step = {
            self.calls.lock().unwrap().push(params.clone());
            self.scripts
                .lock()
                .unwrap()
                .get_mut(&params.url)
                .and_then(|steps| steps.pop_front())
                .unwrap_or(Step::Succeed)
        };

        for event in &self.progress {
            events.send(event.clone()).ok();
        }

        if let Some((started, permits)) = &self.gate {
            started.send(params.url.clone()).ok();
            permits.acquire().await.unwrap().forget();
        }

        match step {
            Step::Succeed => Ok(metadata_for(&params.url)),
            Step::Fail(error) => Err(error),
            Step::Panic => panic!("scripted engine panic"),
        }
    }

    async fn probe(&self, url: &str) -> Result<MediaInfo, EngineError> {
        self.infos
            .get(url)
            .cloned()
            .ok_or_else(|| EngineError::NetworkExtraction {
                message: format!("ERROR: [generic] Unsupported URL: {url}"),
            })
    }

    async fn probe_playlist(&self, url: &str) -> Result<PlaylistInfo, EngineError> {
        self.playlists
            .get(url)
            .cloned()
            .ok_or_else(|| EngineError::NetworkExtraction {
                message: format!("ERROR: [generic] Unsupported URL: {url}"),
            })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// History store that always fails
pub(crate) struct FailingHistory;

#[async_trait]
impl HistoryStore for FailingHistory {
    async fn record(&self, _entry: &NewHistoryEntry) -> crate::Result<()> {
        Err(crate::Error::Other("history unavailable".to_string()))
    }
}

/// Metadata the scripted engine reports for a URL
pub(crate) fn metadata_for(url: &str) -> MediaMetadata {
    let id = url.rsplit('=').next().unwrap_or(url).to_string();
    MediaMetadata {
        title: Some(format!("Title {id}")),
        webpage_url: Some(url.to_string()),
        filepath: Some(format!("/downloads/{id}.mp4")),
        filesize: Some(1024),
        id: Some(id),
        ..Default::default()
    }
}

/// Watch URL for a short id
pub(crate) fn video_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

/// Error the engine reports when browser cookies cannot be decrypted
pub(crate) fn cookie_error() -> EngineError {
    EngineError::AuthDecryption {
        message: "ERROR: Failed to decrypt cookie (AES-GCM) because the MAC check failed"
            .to_string(),
    }
}

/// Some transfer progress followed by completion
pub(crate) fn sample_progress() -> Vec<EngineEvent> {
    vec![
        EngineEvent::Transfer(TransferEvent::downloading(512, Some(1024))),
        EngineEvent::Transfer(TransferEvent::finished(Some(1024))),
    ]
}

/// Test configuration rooted in a temp dir
pub(crate) fn test_config(root: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = root.join("test.db");
    config.download.save_path = root.join("downloads");
    config
}

/// Helper to create a test QueueManager with the given engine and config tweaks.
/// Returns the manager and the tempdir (which must be kept alive).
pub(crate) async fn create_test_manager_with(
    engine: Arc<dyn Engine>,
    configure: impl FnOnce(&mut Config),
) -> (QueueManager, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(temp_dir.path());
    configure(&mut config);

    let db = Database::new(&config.persistence.database_path)
        .await
        .unwrap();

    (
        QueueManager::with_components(config, engine, Arc::new(db)),
        temp_dir,
    )
}

/// Helper to create a test QueueManager with default test config
pub(crate) async fn create_test_manager(
    engine: Arc<dyn Engine>,
) -> (QueueManager, tempfile::TempDir) {
    create_test_manager_with(engine, |_| {}).await
}

/// Drain every event currently buffered on the stream
pub(crate) fn drain_events(
    stream: &mut tokio_stream::wrappers::UnboundedReceiverStream<Event>,
) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = stream.as_mut().try_recv() {
        events.push(event);
    }
    events
}
