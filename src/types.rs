//! Core types for media-dl

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::utils::{content_id_for_url, format_bytes, format_eta};

/// Unique identifier for a queue item
///
/// Assigned sequentially on enqueue and never reused, not even after the
/// queue is cleared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl ItemId {
    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a queue item
///
/// Transitions are monotonic: `Pending -> Downloading -> {Completed | Failed |
/// Skipped}`, and `Cancelled` is only ever applied to items that never left
/// `Pending`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Waiting to be processed
    Pending,
    /// Currently being handed to the engine
    Downloading,
    /// User skipped the item while it was active
    Skipped,
    /// Abandoned before it was ever started
    Cancelled,
    /// Engine finished successfully
    Completed,
    /// Engine (or the item boundary) reported a failure
    Failed {
        /// Human-readable failure reason
        reason: String,
    },
}

impl ItemStatus {
    /// Whether the item has reached a final state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ItemStatus::Pending | ItemStatus::Downloading)
    }

    /// Whether moving from this status to `next` respects the item lifecycle
    pub fn can_transition_to(&self, next: &ItemStatus) -> bool {
        matches!(
            (self, next),
            (ItemStatus::Pending, ItemStatus::Downloading)
                | (ItemStatus::Pending, ItemStatus::Cancelled)
                | (ItemStatus::Downloading, ItemStatus::Completed)
                | (ItemStatus::Downloading, ItemStatus::Failed { .. })
                | (ItemStatus::Downloading, ItemStatus::Skipped)
        )
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Pending => f.write_str("Pending"),
            ItemStatus::Downloading => f.write_str("Downloading"),
            ItemStatus::Skipped => f.write_str("Skipped"),
            ItemStatus::Cancelled => f.write_str("Cancelled"),
            ItemStatus::Completed => f.write_str("Completed"),
            ItemStatus::Failed { reason } => write!(f, "Failed: {reason}"),
        }
    }
}

static HEIGHT_LABEL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(\d{2,4})\s*p\s*$").ok());

/// Requested quality for a queue item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Quality {
    /// Video capped at the given vertical resolution
    Height(u32),
    /// Audio track only
    AudioOnly,
}

impl Default for Quality {
    fn default() -> Self {
        Quality::Height(720)
    }
}

impl Quality {
    /// Whether this quality requests only the audio track
    pub fn is_audio_only(&self) -> bool {
        matches!(self, Quality::AudioOnly)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Height(h) => write!(f, "{h}p"),
            Quality::AudioOnly => f.write_str("Audio Only"),
        }
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        if normalized == "audio only" || normalized == "audio" {
            return Ok(Quality::AudioOnly);
        }

        HEIGHT_LABEL
            .as_ref()
            .and_then(|re| re.captures(s))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .filter(|h| *h > 0)
            .map(Quality::Height)
            .ok_or_else(|| format!("unrecognized quality label: {s:?}"))
    }
}

impl TryFrom<String> for Quality {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Quality> for String {
    fn from(quality: Quality) -> Self {
        quality.to_string()
    }
}

/// Per-item quality/format/audio selection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSelection {
    /// Requested quality
    pub quality: Quality,
    /// Container for video (`mp4`, `mkv`, `avi`, ...) or codec for audio
    /// (`best`, `mp3`, `flac`, ...)
    pub format: String,
    /// Audio track choice (`best` or a codec name)
    pub audio: String,
}

impl Default for ItemSelection {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            format: "mp4".to_string(),
            audio: "best".to_string(),
        }
    }
}

impl ItemSelection {
    /// Video selection at the given quality and container
    pub fn video(quality: Quality, format: impl Into<String>) -> Self {
        Self {
            quality,
            format: format.into(),
            ..Default::default()
        }
    }

    /// Audio-only selection with the given codec (`best` keeps the
    /// configured default codec)
    pub fn audio_only(codec: impl Into<String>) -> Self {
        Self {
            quality: Quality::AudioOnly,
            format: codec.into(),
            ..Default::default()
        }
    }
}

/// What the UI hands to [`crate::QueueManager::enqueue`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    /// Display title
    pub title: String,
    /// Source URL
    pub url: String,
    /// Quality/format/audio choice
    #[serde(default)]
    pub selection: ItemSelection,
    /// Duration hint in seconds, if known
    #[serde(default)]
    pub duration_secs: Option<u64>,
}

impl NewItem {
    /// Create an item with the default selection
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            selection: ItemSelection::default(),
            duration_secs: None,
        }
    }

    /// Replace the selection
    pub fn with_selection(mut self, selection: ItemSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Set the duration hint
    pub fn with_duration(mut self, secs: u64) -> Self {
        self.duration_secs = Some(secs);
        self
    }
}

/// One queued download
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Queue-local identifier
    pub id: ItemId,
    /// Display title
    pub title: String,
    /// Source URL
    pub url: String,
    /// Quality/format/audio choice
    pub selection: ItemSelection,
    /// Duration hint in seconds
    pub duration_secs: Option<u64>,
    /// Current status
    pub status: ItemStatus,
}

/// Outcome counters for one queue run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Items that completed successfully
    pub completed: usize,
    /// Items that failed
    pub failed: usize,
    /// Items the user skipped
    pub skipped: usize,
    /// Items left pending because the run was cancelled
    pub cancelled_remaining: usize,
    /// Whether the run stopped because of a cancel request
    pub cancelled: bool,
}

impl RunSummary {
    /// Number of items that were actually processed in this run
    pub fn processed(&self) -> usize {
        self.completed + self.failed + self.skipped
    }
}

/// Sanitized metadata reported by the engine for a finished download
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Engine-side content identifier (e.g. the video id)
    #[serde(default)]
    pub id: Option<String>,
    /// Content title
    #[serde(default)]
    pub title: Option<String>,
    /// Canonical page URL
    #[serde(default)]
    pub webpage_url: Option<String>,
    /// Uploader / channel name
    #[serde(default)]
    pub uploader: Option<String>,
    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,
    /// Engine format description
    #[serde(default)]
    pub format: Option<String>,
    /// Resolution description (`1280x720`, `audio only`)
    #[serde(default)]
    pub resolution: Option<String>,
    /// Final output path
    #[serde(default)]
    pub filepath: Option<String>,
    /// Exact file size in bytes
    #[serde(default)]
    pub filesize: Option<u64>,
    /// Approximate file size in bytes
    #[serde(default)]
    pub filesize_approx: Option<u64>,
}

impl MediaMetadata {
    /// Stable identifier used to key history records
    ///
    /// Falls back to a hash of `fallback_url` when the engine reported no id.
    pub fn content_id(&self, fallback_url: &str) -> String {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => content_id_for_url(self.webpage_url.as_deref().unwrap_or(fallback_url)),
        }
    }

    /// Best known file size
    pub fn size_bytes(&self) -> Option<u64> {
        self.filesize.or(self.filesize_approx)
    }
}

/// Persisted record of a completed download
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Stable content identifier (primary key)
    pub content_id: String,
    /// Content title
    pub title: String,
    /// Source URL
    pub url: String,
    /// Uploader / channel name
    pub uploader: Option<String>,
    /// Duration in seconds
    pub duration_secs: Option<f64>,
    /// Engine format description
    pub format: Option<String>,
    /// Resolution description
    pub resolution: Option<String>,
    /// Final output path
    pub file_path: Option<String>,
    /// File size in bytes
    pub file_size: Option<u64>,
    /// When the record was (last) written
    pub downloaded_at: DateTime<Utc>,
    /// Record status (`completed`)
    pub status: String,
}

/// Display phase of the active item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum PhaseLabel {
    /// Bytes are being transferred
    Downloading,
    /// Transfer finished, post-processing not yet reported
    PostProcessingPending,
    /// A named post-processing stage is running
    Stage(String),
    /// Post-processing finished
    Complete,
}

impl PhaseLabel {
    /// Human-readable label
    pub fn label(&self) -> &str {
        match self {
            PhaseLabel::Downloading => "downloading",
            PhaseLabel::PostProcessingPending => "post-processing pending",
            PhaseLabel::Stage(name) => name,
            PhaseLabel::Complete => "complete",
        }
    }
}

/// One normalized progress update for the active item
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Item this update belongs to
    pub id: ItemId,
    /// Current phase
    pub phase: PhaseLabel,
    /// Completed fraction in `0.0..=1.0`; `None` means indeterminate
    pub fraction: Option<f32>,
    /// Bytes transferred so far
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded_bytes: Option<u64>,
    /// Total bytes (exact or estimated)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    /// Transfer speed in bytes per second
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_bps: Option<f64>,
    /// Estimated seconds remaining
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_secs: Option<u64>,
}

impl ProgressUpdate {
    /// Render a terminal-style status line
    ///
    /// ```
    /// use media_dl::{ItemId, PhaseLabel, ProgressUpdate};
    ///
    /// let update = ProgressUpdate {
    ///     id: ItemId(1),
    ///     phase: PhaseLabel::Downloading,
    ///     fraction: Some(0.42),
    ///     downloaded_bytes: Some(4_404_019),
    ///     total_bytes: Some(10 * 1024 * 1024),
    ///     speed_bps: Some(1.5 * 1024.0 * 1024.0),
    ///     eta_secs: Some(7),
    /// };
    /// assert_eq!(
    ///     update.summary_line(),
    ///     "[download]  42.0% of 10.0MB at 1.50MiB/s ETA 00:00:07"
    /// );
    /// ```
    pub fn summary_line(&self) -> String {
        let speed_mib = self.speed_bps.unwrap_or(0.0) / (1024.0 * 1024.0);
        let eta = format_eta(self.eta_secs);

        match &self.phase {
            PhaseLabel::Downloading => match (self.fraction, self.total_bytes) {
                (Some(fraction), Some(total)) => format!(
                    "[download] {:5.1}% of {} at {:.2}MiB/s ETA {}",
                    fraction * 100.0,
                    format_bytes(total),
                    speed_mib,
                    eta
                ),
                _ => format!(
                    "[download] {} of unknown size at {:.2}MiB/s ETA {}",
                    format_bytes(self.downloaded_bytes.unwrap_or(0)),
                    speed_mib,
                    eta
                ),
            },
            PhaseLabel::PostProcessingPending => {
                "Download finished, post-processing...".to_string()
            }
            PhaseLabel::Stage(name) => format!("Post-processing: {name}"),
            PhaseLabel::Complete => "Post-processing completed!".to_string(),
        }
    }
}

/// Event emitted on the queue's update stream
///
/// Consumers receive these through [`crate::QueueManager::updates`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Item appended to the queue
    Queued {
        /// Item ID
        id: ItemId,
        /// Item title
        title: String,
    },

    /// Queue emptied
    QueueCleared {
        /// Number of items removed
        removed: usize,
    },

    /// A run started
    RunStarted {
        /// Number of pending items the run will try to process
        pending: usize,
    },

    /// An item was handed to the executor
    ItemStarted {
        /// Item ID
        id: ItemId,
        /// 1-based position among this run's items
        position: usize,
        /// Number of items in this run
        total: usize,
        /// Item title
        title: String,
    },

    /// Normalized engine progress
    Progress(ProgressUpdate),

    /// Cookie decryption failed; retrying once without browser cookies
    RetryingWithoutCookies {
        /// Item ID
        id: ItemId,
        /// The original failure
        reason: String,
    },

    /// Item finished successfully
    ItemCompleted {
        /// Item ID
        id: ItemId,
        /// Final output path, if the engine reported it
        #[serde(skip_serializing_if = "Option::is_none")]
        file_path: Option<String>,
    },

    /// Item failed
    ItemFailed {
        /// Item ID
        id: ItemId,
        /// Failure reason
        error: String,
    },

    /// Item was skipped by the user
    ItemSkipped {
        /// Item ID
        id: ItemId,
    },

    /// Cancel acknowledged; the active item still runs to completion
    CancelRequested,

    /// Skip acknowledged for the active item
    SkipRequested {
        /// Item ID
        id: ItemId,
    },

    /// Pending items were marked cancelled
    PendingAbandoned {
        /// Number of items affected
        count: usize,
    },

    /// Run ended (queue exhausted or cancelled)
    RunFinished {
        /// Outcome counters
        summary: RunSummary,
    },
}
