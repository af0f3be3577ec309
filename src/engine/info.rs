//! Info probing: what a URL offers before anything is downloaded

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Watch URL used for flat playlist entries that only carry an id
const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// A video-only format
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoFormat {
    /// Engine format id (`137`, `248`)
    pub format_id: String,
    /// `1920x1080`
    pub resolution: Option<String>,
    /// Frames per second
    pub fps: Option<f64>,
    /// Video codec
    pub vcodec: Option<String>,
    /// Container extension
    pub ext: Option<String>,
    /// Exact or approximate size in bytes
    pub filesize: Option<u64>,
    /// Engine note (`1080p`, `Premium`)
    pub format_note: Option<String>,
}

/// An audio-only format
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Engine format id (`140`, `251`)
    pub format_id: String,
    /// Audio codec
    pub acodec: Option<String>,
    /// Average bitrate in kbit/s
    pub abr: Option<f64>,
    /// Exact or approximate size in bytes
    pub filesize: Option<u64>,
}

/// Available formats grouped the way a format picker shows them
///
/// Muxed formats (video and audio together) appear in neither list but still
/// contribute their extension to `containers`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatSummary {
    /// Video-only formats in engine order
    pub video: Vec<VideoFormat>,
    /// Audio-only formats in engine order
    pub audio: Vec<AudioFormat>,
    /// Every container extension offered, sorted
    pub containers: Vec<String>,
}

/// Description of a single media URL
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Engine-side content id
    pub id: Option<String>,
    /// Content title
    pub title: Option<String>,
    /// Duration in seconds
    pub duration: Option<f64>,
    /// Uploader / channel name
    pub uploader: Option<String>,
    /// Thumbnail URL
    pub thumbnail: Option<String>,
    /// Whether this is a live stream
    pub is_live: bool,
    /// Formats on offer
    pub formats: FormatSummary,
}

impl MediaInfo {
    /// Duration rounded to whole seconds, suitable as a queue hint
    pub fn duration_secs(&self) -> Option<u64> {
        whole_seconds(self.duration)
    }
}

/// One entry of a flat playlist listing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    /// Engine-side content id
    pub id: Option<String>,
    /// Entry title (`Unknown` when the listing has none)
    pub title: String,
    /// Duration in seconds, when listed
    pub duration: Option<f64>,
    /// URL to download the entry from
    pub url: String,
}

impl PlaylistEntry {
    /// Duration rounded to whole seconds, suitable as a queue hint
    pub fn duration_secs(&self) -> Option<u64> {
        whole_seconds(self.duration)
    }
}

/// A playlist expanded into its entries
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaylistInfo {
    /// Playlist title (`Playlist` when the listing has none)
    pub title: String,
    /// Playlist owner
    pub uploader: Option<String>,
    /// Entries in playlist order
    pub entries: Vec<PlaylistEntry>,
}

fn whole_seconds(duration: Option<f64>) -> Option<u64> {
    duration
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map(|d| d.round() as u64)
}

#[derive(Deserialize)]
struct RawFormat {
    format_id: Option<String>,
    resolution: Option<String>,
    fps: Option<f64>,
    vcodec: Option<String>,
    acodec: Option<String>,
    abr: Option<f64>,
    ext: Option<String>,
    filesize: Option<u64>,
    filesize_approx: Option<u64>,
    format_note: Option<String>,
}

#[derive(Deserialize)]
struct RawInfo {
    id: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    thumbnail: Option<String>,
    is_live: Option<bool>,
    formats: Option<Vec<RawFormat>>,
}

#[derive(Deserialize)]
struct RawEntry {
    id: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    url: Option<String>,
}

#[derive(Deserialize)]
struct RawPlaylist {
    title: Option<String>,
    uploader: Option<String>,
    entries: Option<Vec<Option<RawEntry>>>,
}

fn unparseable(what: &str, e: serde_json::Error) -> EngineError {
    EngineError::Unexpected {
        message: format!("unparseable {what} JSON from yt-dlp: {e}"),
    }
}

fn summarize_formats(formats: Vec<RawFormat>) -> FormatSummary {
    let mut summary = FormatSummary::default();
    let mut containers = BTreeSet::new();

    for format in formats {
        if let Some(ext) = &format.ext {
            containers.insert(ext.clone());
        }
        let has_video = format.vcodec.as_deref() != Some("none");
        let has_audio = format.acodec.as_deref() != Some("none");
        let filesize = format.filesize.or(format.filesize_approx);
        let format_id = format.format_id.unwrap_or_default();

        match (has_video, has_audio) {
            (true, false) => summary.video.push(VideoFormat {
                format_id,
                resolution: format.resolution,
                fps: format.fps,
                vcodec: format.vcodec,
                ext: format.ext,
                filesize,
                format_note: format.format_note,
            }),
            (false, true) => summary.audio.push(AudioFormat {
                format_id,
                acodec: format.acodec,
                abr: format.abr,
                filesize,
            }),
            _ => {}
        }
    }

    summary.containers = containers.into_iter().collect();
    summary
}

/// Parse the single-JSON dump of one media URL
pub fn parse_media_info(json: &str) -> Result<MediaInfo, EngineError> {
    let raw: RawInfo = serde_json::from_str(json).map_err(|e| unparseable("info", e))?;

    Ok(MediaInfo {
        id: raw.id,
        title: raw.title,
        duration: raw.duration,
        uploader: raw.uploader,
        thumbnail: raw.thumbnail,
        is_live: raw.is_live.unwrap_or(false),
        formats: summarize_formats(raw.formats.unwrap_or_default()),
    })
}

/// Parse the flat single-JSON dump of a playlist
///
/// Entries without a URL fall back to the watch URL of their id; entries with
/// neither are dropped.
pub fn parse_playlist_info(json: &str) -> Result<PlaylistInfo, EngineError> {
    let raw: RawPlaylist = serde_json::from_str(json).map_err(|e| unparseable("playlist", e))?;

    let entries = raw
        .entries
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .filter_map(|entry| {
            let url = match (entry.url, &entry.id) {
                (Some(url), _) if !url.trim().is_empty() => url,
                (_, Some(id)) if !id.trim().is_empty() => format!("{WATCH_URL_PREFIX}{id}"),
                _ => {
                    tracing::debug!("dropping playlist entry without url or id");
                    return None;
                }
            };
            Some(PlaylistEntry {
                id: entry.id,
                title: entry.title.unwrap_or_else(|| "Unknown".to_string()),
                duration: entry.duration,
                url,
            })
        })
        .collect();

    Ok(PlaylistInfo {
        title: raw.title.unwrap_or_else(|| "Playlist".to_string()),
        uploader: raw.uploader,
        entries,
    })
}
