//! Parser for yt-dlp console output

use super::args::{POSTPROCESS_FIELDS, TRANSFER_FIELDS};
use super::events::{EngineEvent, PostProcessEvent, RawFields, TransferEvent};
use crate::error::EngineError;
use crate::types::MediaMetadata;
use regex::Regex;
use std::sync::LazyLock;

/// Prefix of transfer-hook lines
pub const TRANSFER_MARKER: &str = "__MDL_DL__";
/// Prefix of post-processing-hook lines
pub const POSTPROCESS_MARKER: &str = "__MDL_PP__";
/// Prefix of the final metadata line
pub const METADATA_MARKER: &str = "__MDL_META__";

/// Exit status of an external command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The command exited successfully (exit code 0)
    Success,
    /// The command exited with the given non-zero code
    Failure(i32),
    /// The command was terminated without an exit code (signal)
    Terminated,
}

impl ExitStatus {
    /// Returns `true` if the exit status represents success
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        match status.code() {
            Some(0) => Self::Success,
            Some(code) => Self::Failure(code),
            None => Self::Terminated,
        }
    }
}

/// A recognized line of engine output
#[derive(Debug, Clone, PartialEq)]
pub enum OutputLine {
    /// Progress from either hook
    Event(EngineEvent),
    /// Final sanitized metadata
    Metadata(Box<MediaMetadata>),
}

fn split_fields(payload: &str, names: &[&str]) -> RawFields {
    names
        .iter()
        .zip(payload.splitn(names.len(), '|'))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// Recognize one line of output
///
/// Lines without one of the markers (regular log output) and marked lines
/// whose payload cannot be understood yield `None`.
pub fn parse_line(line: &str) -> Option<OutputLine> {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(payload) = line.split_once(TRANSFER_MARKER).map(|(_, rest)| rest) {
        let fields = split_fields(payload, TRANSFER_FIELDS);
        return TransferEvent::from_fields(&fields)
            .map(|event| OutputLine::Event(EngineEvent::Transfer(event)));
    }

    if let Some(payload) = line.split_once(POSTPROCESS_MARKER).map(|(_, rest)| rest) {
        let fields = split_fields(payload, POSTPROCESS_FIELDS);
        return PostProcessEvent::from_fields(&fields)
            .map(|event| OutputLine::Event(EngineEvent::PostProcess(event)));
    }

    if let Some(payload) = line.split_once(METADATA_MARKER).map(|(_, rest)| rest) {
        return match serde_json::from_str::<MediaMetadata>(payload) {
            Ok(metadata) => Some(OutputLine::Metadata(Box::new(metadata))),
            Err(e) => {
                tracing::warn!(error = %e, "unparseable metadata line from yt-dlp");
                None
            }
        };
    }

    None
}

static COOKIE_DECRYPTION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)(failed to decrypt with dpapi|failed to decrypt cookie|could not decrypt (the )?cookies?)").ok()
});

fn mentions_cookie_decryption(line: &str) -> bool {
    match COOKIE_DECRYPTION.as_ref() {
        Some(re) => re.is_match(line),
        None => line.contains("Failed to decrypt with DPAPI"),
    }
}

/// Classify a failed invocation from its exit status and stderr tail
///
/// Only the final `ERROR:` line is considered; warnings and informational
/// output never decide the class.
///
/// - final `ERROR:` line reports cookie decryption -> [`EngineError::AuthDecryption`]
/// - any other final `ERROR:` line -> [`EngineError::NetworkExtraction`]
/// - no `ERROR:` line -> [`EngineError::Unexpected`] with the tail attached
pub fn classify_failure(exit_status: ExitStatus, stderr_tail: &[String]) -> EngineError {
    if let Some(line) = stderr_tail
        .iter()
        .map(|l| l.trim())
        .rev()
        .find(|l| l.starts_with("ERROR:"))
    {
        let message = line.to_string();
        return if mentions_cookie_decryption(line) {
            EngineError::AuthDecryption { message }
        } else {
            EngineError::NetworkExtraction { message }
        };
    }

    let status = match exit_status {
        ExitStatus::Success => "exited successfully".to_string(),
        ExitStatus::Failure(code) => format!("exited with code {code}"),
        ExitStatus::Terminated => "terminated by signal".to_string(),
    };
    let tail = stderr_tail.join("\n");
    EngineError::Unexpected {
        message: if tail.trim().is_empty() {
            format!("yt-dlp {status}")
        } else {
            format!("yt-dlp {status}: {}", tail.trim())
        },
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::events::{PostProcessPhase, TransferPhase};

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_parse_transfer_line() {
        let line = format!("{TRANSFER_MARKER}downloading|2097152|NA|8388608|1048576.0|6");
        let Some(OutputLine::Event(EngineEvent::Transfer(event))) = parse_line(&line) else {
            panic!("expected transfer event");
        };

        assert_eq!(event.phase, TransferPhase::Downloading);
        assert_eq!(event.downloaded_bytes, Some(2_097_152));
        assert_eq!(event.total_bytes, Some(8_388_608));
        assert_eq!(event.speed_bps, Some(1_048_576.0));
        assert_eq!(event.eta_secs, Some(6));
    }

    #[test]
    fn test_parse_finished_transfer_line() {
        let line = format!("{TRANSFER_MARKER}finished|8388608|8388608|NA|NA|NA\r\n");
        let Some(OutputLine::Event(EngineEvent::Transfer(event))) = parse_line(&line) else {
            panic!("expected transfer event");
        };
        assert_eq!(event.phase, TransferPhase::Finished);
        assert_eq!(event.eta_secs, None);
    }

    #[test]
    fn test_parse_postprocess_line() {
        let line = format!("{POSTPROCESS_MARKER}started|FFmpegExtractAudio");
        assert_eq!(
            parse_line(&line),
            Some(OutputLine::Event(EngineEvent::PostProcess(
                PostProcessEvent::new(PostProcessPhase::Started, "FFmpegExtractAudio")
            )))
        );
    }

    #[test]
    fn test_parse_metadata_line() {
        let line = format!(
            r#"{METADATA_MARKER}{{"id":"abc123","title":"A talk","webpage_url":"https://www.youtube.com/watch?v=abc123","uploader":"Someone","duration":212.0,"format":"137 - 1920x1080 (1080p)+140 - audio only","resolution":"1920x1080","filepath":"/out/A talk [abc123].mp4","filesize":null,"filesize_approx":51234567}}"#
        );
        let Some(OutputLine::Metadata(metadata)) = parse_line(&line) else {
            panic!("expected metadata");
        };

        assert_eq!(metadata.id.as_deref(), Some("abc123"));
        assert_eq!(metadata.uploader.as_deref(), Some("Someone"));
        assert_eq!(metadata.duration, Some(212.0));
        assert_eq!(metadata.filesize, None);
        assert_eq!(metadata.size_bytes(), Some(51_234_567));
    }

    #[test]
    fn test_ignores_regular_output() {
        assert!(parse_line("[youtube] abc123: Downloading webpage").is_none());
        assert!(parse_line("").is_none());
        assert!(parse_line(&format!("{METADATA_MARKER}not json")).is_none());
        assert!(parse_line(&format!("{TRANSFER_MARKER}error|NA|NA|NA|NA|NA")).is_none());
    }

    #[test]
    fn test_classify_dpapi_failure() {
        let tail = lines(&[
            "[youtube] Extracting URL",
            "ERROR: Failed to decrypt with DPAPI. See  https://github.com/yt-dlp/yt-dlp/issues/10927",
        ]);
        let err = classify_failure(ExitStatus::Failure(1), &tail);
        assert!(err.is_auth_decryption(), "got {err:?}");
    }

    #[test]
    fn test_classify_ignores_cookie_warnings_before_other_errors() {
        let tail = lines(&[
            "WARNING: cannot decrypt v11 cookies: no key found",
            "Extracted 305 cookies from chrome (2 could not be decrypted)",
            "ERROR: [youtube] abc: Video unavailable",
        ]);
        let err = classify_failure(ExitStatus::Failure(1), &tail);
        assert!(!err.is_auth_decryption(), "got {err:?}");
        assert_eq!(
            err,
            EngineError::NetworkExtraction {
                message: "ERROR: [youtube] abc: Video unavailable".into()
            }
        );
    }

    #[test]
    fn test_classify_cookie_warning_without_error_line_is_unexpected() {
        let tail = lines(&["WARNING: cannot decrypt v11 cookies: no key found"]);
        let err = classify_failure(ExitStatus::Failure(1), &tail);
        assert!(!err.is_auth_decryption(), "got {err:?}");
        assert_eq!(err.error_code(), "unexpected_engine_error");
    }

    #[test]
    fn test_classify_decided_by_final_error_line() {
        let tail = lines(&[
            "ERROR: Failed to decrypt with DPAPI",
            "ERROR: [youtube] abc: Video unavailable",
        ]);
        assert!(!classify_failure(ExitStatus::Failure(1), &tail).is_auth_decryption());

        let tail = lines(&[
            "ERROR: [youtube] abc: Sign in to confirm your age",
            "ERROR: Failed to decrypt cookie (AES-GCM) because the MAC check failed",
        ]);
        assert!(classify_failure(ExitStatus::Failure(1), &tail).is_auth_decryption());
    }

    #[test]
    fn test_classify_extraction_error_uses_last_error_line() {
        let tail = lines(&[
            "ERROR: [youtube] abc: first",
            "WARNING: retrying",
            "ERROR: [youtube] abc: Video unavailable",
        ]);
        assert_eq!(
            classify_failure(ExitStatus::Failure(1), &tail),
            EngineError::NetworkExtraction {
                message: "ERROR: [youtube] abc: Video unavailable".into()
            }
        );
    }

    #[test]
    fn test_classify_unexpected_keeps_diagnostics() {
        let tail = lines(&["Traceback (most recent call last):", "KeyError: 'x'"]);
        let err = classify_failure(ExitStatus::Failure(2), &tail);
        let EngineError::Unexpected { message } = err else {
            panic!("expected unexpected error");
        };
        assert!(message.contains("exited with code 2"));
        assert!(message.contains("KeyError"));

        let silent = classify_failure(ExitStatus::Terminated, &[]);
        assert_eq!(
            silent,
            EngineError::Unexpected {
                message: "yt-dlp terminated by signal".into()
            }
        );
    }
}
