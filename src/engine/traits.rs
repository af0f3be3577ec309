//! The retrieval engine seam

use super::events::EventSink;
use super::info::{MediaInfo, PlaylistInfo};
use crate::error::EngineError;
use crate::resolver::EngineParams;
use crate::types::MediaMetadata;
use async_trait::async_trait;

/// A retrieval engine: performs the network transfer and post-processing for
/// one item
///
/// Implementations report progress by pushing [`super::EngineEvent`]s into
/// `events` as the work proceeds and return the sanitized metadata of the
/// finished download. Failures must be classified into [`EngineError`]
/// variants so the executor can tell a cookie-decryption failure apart from
/// everything else.
///
/// There is no cancellation hook: once started, an invocation runs to its
/// own conclusion.
///
/// # Examples
///
/// ```no_run
/// use media_dl::engine::{Engine, YtDlpEngine};
/// use media_dl::resolver::ConfigResolver;
/// use media_dl::{Config, ItemSelection};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = YtDlpEngine::from_path().ok_or("yt-dlp not found")?;
/// let resolver = ConfigResolver::new(Arc::new(Config::default()));
/// let params = resolver.resolve(
///     "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
///     &ItemSelection::default(),
///     None,
/// );
///
/// let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
/// tokio::spawn(async move {
///     while let Some(event) = rx.recv().await {
///         println!("{event:?}");
///     }
/// });
/// let metadata = engine.download(&params, tx).await?;
/// println!("saved to {:?}", metadata.filepath);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Engine: Send + Sync {
    /// Download one item with fully resolved parameters
    async fn download(
        &self,
        params: &EngineParams,
        events: EventSink,
    ) -> std::result::Result<MediaMetadata, EngineError>;

    /// Describe one URL without downloading it
    ///
    /// The default implementation reports that probing is unsupported.
    async fn probe(&self, url: &str) -> std::result::Result<MediaInfo, EngineError> {
        Err(EngineError::Unexpected {
            message: format!("{} cannot probe {url}", self.name()),
        })
    }

    /// Expand a playlist URL into its entries without downloading them
    ///
    /// The default implementation reports that probing is unsupported.
    async fn probe_playlist(&self, url: &str) -> std::result::Result<PlaylistInfo, EngineError> {
        Err(EngineError::Unexpected {
            message: format!("{} cannot list playlist {url}", self.name()),
        })
    }

    /// Get the name of this implementation
    fn name(&self) -> &'static str;
}
