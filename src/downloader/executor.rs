//! Single-item execution with the cookie-decryption fallback.
//!
//! The engine runs in its own task so a panic inside it is contained and
//! reported as an ordinary failure of that one item. Engine events are pumped
//! through a [`ProgressAggregator`] while the task runs.

use crate::engine::{Engine, EngineEvent};
use crate::error::EngineError;
use crate::progress::{DownloadSession, ProgressAggregator, SessionPhase, SessionSlot};
use crate::resolver::EngineParams;
use crate::types::{Event, ItemId, MediaMetadata};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Why an item's execution failed
#[derive(Debug, Clone)]
pub struct ExecutionFailure {
    /// Classification of the last failure
    pub error: EngineError,
    /// Human-readable reason; mentions both failures when the fallback retry
    /// also failed
    pub message: String,
    /// Number of engine invocations made (1 or 2)
    pub attempts: u32,
}

impl ExecutionFailure {
    fn single(error: EngineError) -> Self {
        Self {
            message: error.to_string(),
            error,
            attempts: 1,
        }
    }

    fn after_retry(primary: &EngineError, retry: EngineError) -> Self {
        Self {
            message: format!(
                "{primary}; retry without browser cookies also failed: {retry}"
            ),
            error: retry,
            attempts: 2,
        }
    }
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ExecutionFailure {}

/// Runs one item against the engine
///
/// At most two engine invocations are made per item: the primary attempt and,
/// only when the primary fails with a cookie-decryption error while browser
/// cookies were in use, one retry with browser cookies removed.
#[derive(Clone)]
pub struct DownloadExecutor {
    engine: Arc<dyn Engine>,
    updates: mpsc::UnboundedSender<Event>,
    session: SessionSlot,
}

impl DownloadExecutor {
    /// Create an executor publishing progress on `updates` and keeping the
    /// live session in `session`
    pub fn new(
        engine: Arc<dyn Engine>,
        updates: mpsc::UnboundedSender<Event>,
        session: SessionSlot,
    ) -> Self {
        Self {
            engine,
            updates,
            session,
        }
    }

    /// Name of the wrapped engine
    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Execute one item
    ///
    /// `skip` is checked once, between the primary attempt and the fallback
    /// retry: a skipped item is never retried. The caller decides the final
    /// status; this only reports what the engine did.
    pub async fn execute(
        &self,
        id: ItemId,
        params: EngineParams,
        skip: &CancellationToken,
    ) -> Result<MediaMetadata, ExecutionFailure> {
        *self.session.lock().await = Some(DownloadSession::new(id, params.clone()));

        let result = self.execute_with_fallback(id, params, skip).await;

        *self.session.lock().await = None;
        result
    }

    async fn execute_with_fallback(
        &self,
        id: ItemId,
        params: EngineParams,
        skip: &CancellationToken,
    ) -> Result<MediaMetadata, ExecutionFailure> {
        let primary = match self.invoke(id, params.clone()).await {
            Ok(metadata) => return Ok(metadata),
            Err(e) => e,
        };

        if !primary.is_auth_decryption() || !params.uses_browser_cookies() {
            return Err(ExecutionFailure::single(primary));
        }

        if skip.is_cancelled() {
            tracing::debug!(item_id = id.0, "item skipped; not retrying without cookies");
            return Err(ExecutionFailure::single(primary));
        }

        tracing::warn!(
            item_id = id.0,
            error = %primary,
            "cookie decryption failed, retrying without browser cookies"
        );
        self.updates
            .send(Event::RetryingWithoutCookies {
                id,
                reason: primary.to_string(),
            })
            .ok();

        let retry_params = params.without_cookies();
        if let Some(session) = self.session.lock().await.as_mut() {
            *session = DownloadSession::new(id, retry_params.clone());
            session.attempt = 2;
        }

        match self.invoke(id, retry_params).await {
            Ok(metadata) => {
                tracing::info!(item_id = id.0, "download succeeded without browser cookies");
                Ok(metadata)
            }
            Err(retry) => Err(ExecutionFailure::after_retry(&primary, retry)),
        }
    }

    /// One engine invocation, with its events pumped through the aggregator
    async fn invoke(&self, id: ItemId, params: EngineParams) -> Result<MediaMetadata, EngineError> {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<EngineEvent>();
        let mut aggregator = ProgressAggregator::new(id, self.updates.clone(), self.session.clone());

        let engine = Arc::clone(&self.engine);
        let mut task = tokio::spawn(async move { engine.download(&params, event_tx).await });

        let joined = loop {
            tokio::select! {
                biased;
                Some(event) = event_rx.recv() => {
                    aggregator.handle(event).await;
                }
                joined = &mut task => break joined,
            }
        };

        // Events sent just before the engine returned
        while let Ok(event) = event_rx.try_recv() {
            aggregator.handle(event).await;
        }

        if let Some(session) = self.session.lock().await.as_mut() {
            session.phase = SessionPhase::Finished;
        }

        match joined {
            Ok(Err(EngineError::Unexpected { message })) => {
                tracing::error!(item_id = id.0, error = %message, "unexpected engine failure");
                Err(EngineError::Unexpected { message })
            }
            Ok(result) => result,
            Err(join_error) => {
                let message = if join_error.is_panic() {
                    let payload = join_error.into_panic();
                    payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string())
                } else {
                    join_error.to_string()
                };
                tracing::error!(item_id = id.0, error = %message, "engine task panicked");
                Err(EngineError::Unexpected {
                    message: format!("engine task failed: {message}"),
                })
            }
        }
    }
}
