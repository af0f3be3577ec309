//! # media-dl
//!
//! Sequential download-queue orchestrator for media URLs, driving `yt-dlp`.
//!
//! ## Design Philosophy
//!
//! media-dl is designed to be:
//! - **Configurable** - Output, subtitles, metadata, post-processing, network
//!   and authentication are all driven by one JSON config file
//! - **Sensible defaults** - Works out of the box with zero configuration
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers read one update stream, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use futures::StreamExt;
//! use media_dl::{Config, Event, NewItem, QueueManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_or_init("config.json".as_ref()).await;
//!     let manager = QueueManager::new(config).await?;
//!
//!     // Take the update stream (once)
//!     let mut updates = manager.updates().ok_or("stream already taken")?;
//!     tokio::spawn(async move {
//!         while let Some(event) = updates.next().await {
//!             if let Event::Progress(update) = &event {
//!                 println!("{}", update.summary_line());
//!             }
//!         }
//!     });
//!
//!     manager
//!         .enqueue(NewItem::new("Talk", "https://www.youtube.com/watch?v=dQw4w9WgXcQ"))
//!         .await?;
//!     let summary = manager.run().await?;
//!     println!("{} completed, {} failed", summary.completed, summary.failed);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Cookie-derived and preset HTTP headers
pub mod auth;
/// Configuration types
pub mod config;
/// Database persistence layer (download history)
pub mod db;
/// Queue orchestration (decomposed into focused submodules)
pub mod downloader;
/// Retrieval engine seam and the yt-dlp adapter
pub mod engine;
/// Error types
pub mod error;
/// Progress normalization and the live session
pub mod progress;
/// Config + selection to engine parameters
pub mod resolver;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use db::{Database, HistoryStore};
pub use downloader::{DownloadExecutor, ExecutionFailure, QueueManager};
pub use engine::{Engine, MediaInfo, PlaylistEntry, PlaylistInfo, YtDlpEngine};
pub use error::{DatabaseError, EngineError, Error, QueueError, Result};
pub use progress::{DownloadSession, ProgressAggregator};
pub use resolver::{ConfigResolver, EngineParams};
pub use types::{
    Event, HistoryEntry, ItemId, ItemSelection, ItemStatus, MediaMetadata, NewItem, PhaseLabel,
    ProgressUpdate, Quality, QueueItem, RunSummary,
};

/// Helper function to run the queue with graceful signal handling.
///
/// Starts a run in the background. If a termination signal arrives before it
/// ends, the run is cancelled: the item in flight finishes and the remaining
/// ones stay pending.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use media_dl::{Config, NewItem, QueueManager, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let manager = QueueManager::new(Config::default()).await?;
///     manager
///         .enqueue(NewItem::new("", "https://www.youtube.com/watch?v=dQw4w9WgXcQ"))
///         .await?;
///
///     // Run with automatic signal handling
///     let summary = run_with_shutdown(&manager).await?;
///     println!("{summary:?}");
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(manager: &QueueManager) -> Result<RunSummary> {
    let mut run = manager.spawn_run();

    let joined = tokio::select! {
        joined = &mut run => joined,
        _ = wait_for_signal() => {
            manager.cancel();
            run.await
        }
    };

    joined.map_err(|e| Error::Other(format!("queue run task failed: {e}")))?
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
