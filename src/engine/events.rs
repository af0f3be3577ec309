//! Typed engine events
//!
//! The engine reports progress through two independent hooks: transfer
//! progress and post-processing progress. Raw payloads are loosely typed
//! (string field maps); they are wrapped into [`EngineEvent`] right at the
//! adapter boundary and never travel further untyped.

use std::collections::HashMap;
use tokio::sync::mpsc;

/// Channel the engine pushes its events into
pub type EventSink = mpsc::UnboundedSender<EngineEvent>;

/// Raw payload as produced by the engine's progress hooks
pub type RawFields = HashMap<String, String>;

/// Transfer hook status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    /// Bytes are flowing
    Downloading,
    /// One stream finished transferring
    Finished,
}

/// Transfer progress event
#[derive(Debug, Clone, PartialEq)]
pub struct TransferEvent {
    /// Hook status
    pub phase: TransferPhase,
    /// Total size (exact, or the engine's estimate)
    pub total_bytes: Option<u64>,
    /// Bytes transferred so far
    pub downloaded_bytes: Option<u64>,
    /// Speed in bytes per second
    pub speed_bps: Option<f64>,
    /// Estimated seconds remaining
    pub eta_secs: Option<u64>,
}

impl TransferEvent {
    /// A `downloading` event with the given counters
    pub fn downloading(downloaded_bytes: u64, total_bytes: Option<u64>) -> Self {
        Self {
            phase: TransferPhase::Downloading,
            total_bytes,
            downloaded_bytes: Some(downloaded_bytes),
            speed_bps: None,
            eta_secs: None,
        }
    }

    /// A `finished` event
    pub fn finished(total_bytes: Option<u64>) -> Self {
        Self {
            phase: TransferPhase::Finished,
            total_bytes,
            downloaded_bytes: total_bytes,
            speed_bps: None,
            eta_secs: None,
        }
    }
}

/// Post-processing hook status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcessPhase {
    /// A stage started
    Started,
    /// A stage is running
    Processing,
    /// A stage finished
    Finished,
}

/// Post-processing progress event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostProcessEvent {
    /// Hook status
    pub phase: PostProcessPhase,
    /// Stage name as reported by the engine (`Merger`, `FFmpegExtractAudio`, ...)
    pub stage: String,
}

impl PostProcessEvent {
    /// Build an event for the named stage
    pub fn new(phase: PostProcessPhase, stage: impl Into<String>) -> Self {
        Self {
            phase,
            stage: stage.into(),
        }
    }
}

/// An event from either engine hook
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Transfer hook
    Transfer(TransferEvent),
    /// Post-processing hook
    PostProcess(PostProcessEvent),
}

/// Read a field, treating the engine's placeholders as missing
fn field<'a>(fields: &'a RawFields, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && *v != "NA" && *v != "None")
}

fn number(fields: &RawFields, key: &str) -> Option<f64> {
    field(fields, key)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn count(fields: &RawFields, key: &str) -> Option<u64> {
    number(fields, key).map(|v| v.round() as u64)
}

impl TransferEvent {
    /// Wrap a raw transfer-hook payload
    ///
    /// Returns `None` for statuses other than `downloading`/`finished` (for
    /// example `error`, which is reported through the invocation result).
    /// A missing exact total falls back to `total_bytes_estimate`.
    pub fn from_fields(fields: &RawFields) -> Option<Self> {
        let phase = match field(fields, "status")? {
            "downloading" => TransferPhase::Downloading,
            "finished" => TransferPhase::Finished,
            _ => return None,
        };

        Some(Self {
            phase,
            total_bytes: count(fields, "total_bytes")
                .or_else(|| count(fields, "total_bytes_estimate")),
            downloaded_bytes: count(fields, "downloaded_bytes"),
            speed_bps: number(fields, "speed"),
            eta_secs: count(fields, "eta"),
        })
    }
}

impl PostProcessEvent {
    /// Wrap a raw post-processing-hook payload
    ///
    /// Returns `None` for unknown statuses or a missing stage name.
    pub fn from_fields(fields: &RawFields) -> Option<Self> {
        let phase = match field(fields, "status")? {
            "started" => PostProcessPhase::Started,
            "processing" => PostProcessPhase::Processing,
            "finished" => PostProcessPhase::Finished,
            _ => return None,
        };
        let stage = field(fields, "postprocessor")?;
        Some(Self::new(phase, stage))
    }
}
