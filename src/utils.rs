//! Formatting and path helpers shared by the progress model, the configuration
//! loader and the history store

use std::path::{Path, PathBuf};

/// Format a byte count the way download tools print sizes (`10.0MB`)
///
/// Uses 1024-based steps with one decimal place.
///
/// # Examples
///
/// ```
/// use media_dl::utils::format_bytes;
///
/// assert_eq!(format_bytes(512), "512.0B");
/// assert_eq!(format_bytes(10 * 1024 * 1024), "10.0MB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if value < 1024.0 {
            return format!("{value:.1}{unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.1}TB")
}

/// Format a remaining-time estimate as `HH:MM:SS`
///
/// Returns `"N/A"` when the estimate is unknown or zero.
pub fn format_eta(eta_secs: Option<u64>) -> String {
    match eta_secs {
        Some(secs) if secs > 0 => {
            let hours = secs / 3600;
            let minutes = (secs % 3600) / 60;
            let seconds = secs % 60;
            format!("{hours:02}:{minutes:02}:{seconds:02}")
        }
        _ => "N/A".to_string(),
    }
}

/// Expand a leading `~` to the user's home directory
///
/// Paths without a leading `~` (and all paths when no home directory can be
/// determined) are returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };

    match home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Derive a stable content identifier from a source URL
///
/// Used when the engine does not report its own content id, so repeated
/// downloads of the same URL still land on the same history record.
pub fn content_id_for_url(url: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(url.trim().as_bytes());
    format!("url-{:x}", hasher.finalize())
}
