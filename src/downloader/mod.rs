//! Queue orchestration split into focused submodules.
//!
//! The `QueueManager` struct and its methods are organized by domain:
//! - [`queue`] - Enqueue, clear, inspection, abandoning pending items
//! - [`control`] - Cancel and skip signalling
//! - [`run`] - The sequential run loop and its background spawner
//! - [`executor`] - One item's engine invocation and the cookie fallback retry
//! - [`history`] - History store queries
//! - [`probe`] - Info probing and playlist expansion

mod control;
mod executor;
mod history;
mod probe;
mod queue;
mod run;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use executor::{DownloadExecutor, ExecutionFailure};

use crate::config::Config;
use crate::db::{Database, HistoryStore};
use crate::engine::{Engine, YtDlpEngine};
use crate::error::{Error, Result};
use crate::progress::SessionSlot;
use crate::resolver::ConfigResolver;
use crate::types::{Event, ItemId, QueueItem};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64};
use tokio::sync::{Mutex, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

/// The item currently handed to the executor
#[derive(Debug, Clone)]
pub(crate) struct ActiveItem {
    pub(crate) id: ItemId,
    /// Skip signal for this item only; a fresh token per item
    pub(crate) skip: CancellationToken,
}

/// Queue contents and the flags shared between the worker and callers
#[derive(Clone)]
pub(crate) struct QueueState {
    /// Items in enqueue order (append-only until cleared)
    pub(crate) items: Arc<Mutex<Vec<QueueItem>>>,
    /// Next item id; never reset, so ids are not reused after a clear
    pub(crate) next_id: Arc<AtomicU64>,
    /// Set by `cancel()`; reset only when a new run starts
    pub(crate) cancel_requested: Arc<AtomicBool>,
    /// Reentrancy guard for `run()`
    pub(crate) is_running: Arc<AtomicBool>,
    /// Item being executed right now
    pub(crate) active: Arc<Mutex<Option<ActiveItem>>>,
}

impl QueueState {
    fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            cancel_requested: Arc::new(AtomicBool::new(false)),
            is_running: Arc::new(AtomicBool::new(false)),
            active: Arc::new(Mutex::new(None)),
        }
    }
}

/// Download queue orchestrator (cloneable - all fields are Arc-wrapped)
///
/// Owns the ordered queue, runs it sequentially against the engine and
/// publishes every state change on a single update stream.
#[derive(Clone)]
pub struct QueueManager {
    /// Database for history queries (wrapped in Arc for sharing across tasks)
    pub db: Arc<Database>,
    /// Where completed downloads are recorded
    pub(crate) history: Arc<dyn HistoryStore>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Config + selection -> engine parameters
    pub(crate) resolver: ConfigResolver,
    /// Engine, shared with the executor; used directly for probing
    pub(crate) engine: Arc<dyn Engine>,
    /// Runs one item against the engine
    pub(crate) executor: DownloadExecutor,
    /// Queue contents and signalling flags
    pub(crate) queue_state: QueueState,
    /// Live session of the active item
    pub(crate) session: SessionSlot,
    /// Sending half of the update stream
    pub(crate) update_tx: mpsc::UnboundedSender<Event>,
    /// Receiving half, handed out once by `updates()`
    pub(crate) update_rx: Arc<std::sync::Mutex<Option<mpsc::UnboundedReceiver<Event>>>>,
}

impl QueueManager {
    /// Create a new QueueManager instance
    ///
    /// This initializes all core components:
    /// - Validates the configuration
    /// - Opens/creates the SQLite history database and runs migrations
    /// - Locates the `yt-dlp` binary (configured path or PATH search)
    /// - Sets up the update channel
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let engine = YtDlpEngine::from_config(&config.engine).ok_or_else(|| {
            Error::ExternalTool(
                "yt-dlp binary not found (set engine.ytdlp_path or install it on PATH)"
                    .to_string(),
            )
        })?;
        tracing::info!(binary = %engine.binary_path().display(), "using yt-dlp");

        let db = Database::new(&config.persistence.database_path).await?;

        Ok(Self::with_components(config, Arc::new(engine), Arc::new(db)))
    }

    /// Assemble a manager from explicit parts
    ///
    /// Useful for embedding a different [`Engine`] (or a test double) and for
    /// sharing one history database between components.
    pub fn with_components(config: Config, engine: Arc<dyn Engine>, db: Arc<Database>) -> Self {
        let config = Arc::new(config);
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let session: SessionSlot = Arc::new(Mutex::new(None));

        Self {
            history: db.clone(),
            db,
            resolver: ConfigResolver::new(config.clone()),
            executor: DownloadExecutor::new(engine.clone(), update_tx.clone(), session.clone()),
            engine,
            config,
            queue_state: QueueState::new(),
            session,
            update_tx,
            update_rx: Arc::new(std::sync::Mutex::new(Some(update_rx))),
        }
    }

    /// Record completed downloads somewhere other than the history database
    pub fn with_history_store(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.history = store;
        self
    }

    /// Take the update stream
    ///
    /// There is exactly one consumer; the first call gets the stream and every
    /// later call returns `None`. Updates are buffered without bound until
    /// consumed.
    pub fn updates(&self) -> Option<UnboundedReceiverStream<Event>> {
        self.update_rx
            .lock()
            .ok()
            .and_then(|mut rx| rx.take())
            .map(UnboundedReceiverStream::new)
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Name of the engine in use
    pub fn engine_name(&self) -> &'static str {
        self.executor.engine_name()
    }

    /// Emit an event on the update stream
    pub(crate) fn emit_event(&self, event: Event) {
        // send() only fails once the consumer has dropped the stream
        self.update_tx.send(event).ok();
    }
}
