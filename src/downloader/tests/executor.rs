use crate::config::Config;
use crate::downloader::DownloadExecutor;
use crate::downloader::test_helpers::{ScriptedEngine, Step, cookie_error, sample_progress, video_url};
use crate::engine::Engine;
use crate::progress::SessionSlot;
use crate::resolver::{ConfigResolver, EngineParams};
use crate::types::{Event, ItemId, ItemSelection};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

fn params(url: &str, use_cookies: bool) -> EngineParams {
    let mut config = Config::default();
    config.authentication.use_cookies = use_cookies;
    ConfigResolver::new(Arc::new(config)).resolve(url, &ItemSelection::default(), None)
}

fn executor(engine: Arc<dyn Engine>) -> (DownloadExecutor, mpsc::UnboundedReceiver<Event>, SessionSlot) {
    let (tx, rx) = mpsc::unbounded_channel();
    let session: SessionSlot = Arc::new(Mutex::new(None));
    (DownloadExecutor::new(engine, tx, session.clone()), rx, session)
}

#[tokio::test]
async fn test_success_returns_engine_metadata() {
    let engine = Arc::new(ScriptedEngine::new().with_progress(sample_progress()));
    let (executor, mut rx, session) = executor(engine.clone());

    let metadata = executor
        .execute(ItemId(7), params(&video_url("x"), false), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(metadata.id.as_deref(), Some("x"));
    assert_eq!(engine.calls().len(), 1);
    assert!(session.lock().await.is_none(), "session cleared after execution");

    let mut progress = 0;
    while let Ok(event) = rx.try_recv() {
        if let Event::Progress(update) = event {
            assert_eq!(update.id, ItemId(7));
            progress += 1;
        }
    }
    assert_eq!(progress, 2);
}

#[tokio::test]
async fn test_retry_session_reports_second_attempt() {
    let (engine, mut gate) = ScriptedEngine::gated();
    let engine = Arc::new(engine.on(&video_url("x"), vec![Step::Fail(cookie_error())]));
    let (executor, _rx, session) = executor(engine.clone());

    let task = {
        let executor = executor.clone();
        tokio::spawn(async move {
            executor
                .execute(ItemId(1), params(&video_url("x"), true), &CancellationToken::new())
                .await
        })
    };

    gate.wait_started().await;
    {
        let current = session.lock().await.clone().unwrap();
        assert_eq!(current.attempt, 1);
        assert!(current.params.uses_browser_cookies());
    }
    gate.release();

    gate.wait_started().await;
    {
        let current = session.lock().await.clone().unwrap();
        assert_eq!(current.attempt, 2);
        assert!(!current.params.uses_browser_cookies());
    }
    gate.release();

    assert!(task.await.unwrap().is_ok());
    assert_eq!(engine.calls().len(), 2);
}

#[tokio::test]
async fn test_failure_reports_attempt_count() {
    let engine = Arc::new(
        ScriptedEngine::new().on(&video_url("x"), vec![Step::Fail(cookie_error()), Step::Fail(cookie_error())]),
    );
    let (executor, _rx, _session) = executor(engine.clone());

    let failure = executor
        .execute(ItemId(1), params(&video_url("x"), true), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(failure.attempts, 2);
    assert!(failure.error.is_auth_decryption());
    assert_eq!(failure.to_string(), failure.message);
    assert_eq!(engine.calls().len(), 2, "never more than one retry");
}

#[tokio::test]
async fn test_single_failure_keeps_engine_message() {
    let engine = Arc::new(ScriptedEngine::new().on(
        &video_url("x"),
        vec![Step::Fail(crate::error::EngineError::NetworkExtraction {
            message: "ERROR: HTTP Error 403: Forbidden".to_string(),
        })],
    ));
    let (executor, _rx, _session) = executor(engine);

    let failure = executor
        .execute(ItemId(1), params(&video_url("x"), true), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(failure.attempts, 1);
    assert_eq!(failure.message, "ERROR: HTTP Error 403: Forbidden");
}

#[test]
fn test_engine_name_passthrough() {
    let (executor, _rx, _session) = executor(Arc::new(ScriptedEngine::new()));
    assert_eq!(executor.engine_name(), "scripted");
}
