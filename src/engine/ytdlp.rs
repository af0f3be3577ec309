//! Engine implementation backed by the external `yt-dlp` program

use super::args::{build_args, build_playlist_probe_args, build_probe_args};
use super::events::EventSink;
use super::info::{MediaInfo, PlaylistInfo, parse_media_info, parse_playlist_info};
use super::parser::{ExitStatus, OutputLine, classify_failure, parse_line};
use super::traits::Engine;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::resolver::EngineParams;
use crate::types::MediaMetadata;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Number of stderr lines kept for failure classification and diagnostics
const STDERR_TAIL_LINES: usize = 200;

/// Engine that drives the `yt-dlp` binary
///
/// Progress is requested through `--progress-template` lines carrying unique
/// markers on both hooks, and the sanitized metadata is printed as a single
/// JSON line after the final file move. Both output streams are scanned for
/// marked lines; stderr is additionally kept as a bounded tail for failure
/// classification.
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    binary_path: PathBuf,
}

impl YtDlpEngine {
    /// Create a new engine with the specified binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Create an engine by searching for `yt-dlp` in PATH
    ///
    /// # Returns
    ///
    /// `Some(YtDlpEngine)` if the binary is found, `None` otherwise.
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Create an engine from configuration: an explicit path wins, otherwise
    /// PATH is searched when allowed
    pub fn from_config(config: &EngineConfig) -> Option<Self> {
        match &config.ytdlp_path {
            Some(path) => Some(Self::new(path.clone())),
            None if config.search_path => Self::from_path(),
            None => None,
        }
    }

    /// Path of the binary this engine runs
    pub fn binary_path(&self) -> &PathBuf {
        &self.binary_path
    }

    /// Run a non-downloading invocation and return its stdout
    async fn dump_json(&self, args: Vec<String>) -> Result<String, EngineError> {
        let output = Command::new(&self.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| EngineError::Unexpected {
                message: format!(
                    "failed to start {}: {}",
                    self.binary_path.display(),
                    e
                ),
            })?;

        let exit_status = ExitStatus::from(output.status);
        if !exit_status.is_success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail: Vec<String> = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..]
                .iter()
                .map(|l| l.to_string())
                .collect();
            return Err(classify_failure(exit_status, &tail));
        }

        String::from_utf8(output.stdout).map_err(|e| EngineError::Unexpected {
            message: format!("yt-dlp printed invalid UTF-8: {e}"),
        })
    }
}

/// Forward marked lines from one output stream
///
/// Returns the metadata line if the stream carried one, plus a bounded tail
/// of the raw lines when `keep_tail` is set.
async fn pump_lines<R>(
    stream: R,
    events: EventSink,
    keep_tail: bool,
) -> (Option<MediaMetadata>, VecDeque<String>)
where
    R: AsyncRead + Unpin,
{
    let mut metadata = None;
    let mut tail = VecDeque::new();
    let mut lines = BufReader::new(stream).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "stopped reading yt-dlp output");
                break;
            }
        };

        match parse_line(&line) {
            Some(OutputLine::Event(event)) => {
                // Receiver may already be gone if the item boundary gave up
                let _ = events.send(event);
            }
            Some(OutputLine::Metadata(parsed)) => metadata = Some(*parsed),
            None => {
                tracing::trace!(line = %line, "yt-dlp");
                if keep_tail {
                    tail.push_back(line);
                    if tail.len() > STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                }
            }
        }
    }

    (metadata, tail)
}

#[async_trait]
impl Engine for YtDlpEngine {
    async fn download(
        &self,
        params: &EngineParams,
        events: EventSink,
    ) -> Result<MediaMetadata, EngineError> {
        let args = build_args(params);
        tracing::debug!(
            binary = %self.binary_path.display(),
            url = %params.url,
            format = %params.format_selector,
            cookies_from_browser = params.uses_browser_cookies(),
            "starting yt-dlp"
        );

        let mut child = Command::new(&self.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Unexpected {
                message: format!(
                    "failed to start {}: {}",
                    self.binary_path.display(),
                    e
                ),
            })?;

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            _ => {
                return Err(EngineError::Unexpected {
                    message: "yt-dlp output pipes were not captured".to_string(),
                });
            }
        };

        let ((stdout_meta, _), (stderr_meta, stderr_tail)) = tokio::join!(
            pump_lines(stdout, events.clone(), false),
            pump_lines(stderr, events, true),
        );

        let status = child.wait().await.map_err(|e| EngineError::Unexpected {
            message: format!("failed to wait for yt-dlp: {e}"),
        })?;
        let exit_status = ExitStatus::from(status);
        let stderr_tail: Vec<String> = stderr_tail.into_iter().collect();

        if !exit_status.is_success() {
            return Err(classify_failure(exit_status, &stderr_tail));
        }

        stdout_meta.or(stderr_meta).ok_or_else(|| EngineError::Unexpected {
            message: format!(
                "yt-dlp exited successfully but reported no metadata{}",
                stderr_tail
                    .last()
                    .map(|l| format!(" (last output: {l})"))
                    .unwrap_or_default()
            ),
        })
    }

    async fn probe(&self, url: &str) -> Result<MediaInfo, EngineError> {
        tracing::debug!(url = %url, "probing media info");
        let json = self.dump_json(build_probe_args(url)).await?;
        parse_media_info(&json)
    }

    async fn probe_playlist(&self, url: &str) -> Result<PlaylistInfo, EngineError> {
        tracing::debug!(url = %url, "listing playlist");
        let json = self.dump_json(build_playlist_probe_args(url)).await?;
        let playlist = parse_playlist_info(&json)?;
        tracing::debug!(title = %playlist.title, entries = playlist.entries.len(), "playlist listed");
        Ok(playlist)
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
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
    use std::sync::Arc;

    #[test]
    fn test_from_path_returns_none_for_nonexistent_binary() {
        let result = which::which("nonexistent-ytdlp-binary-xyz");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_path_binary_discovery() {
        let which_result = which::which("yt-dlp");
        let from_path_result = YtDlpEngine::from_path();

        match which_result {
            Ok(expected_path) => {
                let engine = from_path_result.unwrap();
                assert_eq!(engine.binary_path(), &expected_path);
            }
            Err(_) => assert!(from_path_result.is_none()),
        }
    }

    #[test]
    fn test_from_config_prefers_explicit_path() {
        let config = EngineConfig {
            ytdlp_path: Some("/opt/tools/yt-dlp".into()),
            search_path: false,
        };
        let engine = YtDlpEngine::from_config(&config).unwrap();
        assert_eq!(engine.binary_path(), &PathBuf::from("/opt/tools/yt-dlp"));

        let no_search = EngineConfig {
            ytdlp_path: None,
            search_path: false,
        };
        assert!(YtDlpEngine::from_config(&no_search).is_none());
    }

    #[tokio::test]
    async fn test_missing_binary_is_unexpected_failure() {
        let engine = YtDlpEngine::new(PathBuf::from("/nonexistent/yt-dlp-xyz"));
        let params = ConfigResolver::new(Arc::new(Config::default())).resolve(
            "https://example.com/v",
            &ItemSelection::default(),
            None,
        );
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();

        let err = engine.download(&params, tx).await.unwrap_err();
        assert_eq!(err.error_code(), "unexpected_engine_error");
        assert!(err.to_string().contains("failed to start"));
    }

    #[tokio::test]
    async fn test_probe_with_missing_binary_is_unexpected_failure() {
        let engine = YtDlpEngine::new(PathBuf::from("/nonexistent/yt-dlp-xyz"));

        let err = engine.probe("https://example.com/v").await.unwrap_err();
        assert_eq!(err.error_code(), "unexpected_engine_error");

        let err = engine
            .probe_playlist("https://example.com/list")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to start"));
    }

    #[test]
    fn test_engine_name() {
        assert_eq!(YtDlpEngine::new(PathBuf::from("yt-dlp")).name(), "yt-dlp");
    }
}
