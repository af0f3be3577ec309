//! Configuration types for media-dl
//!
//! The configuration is a nested, key-grouped structure persisted as JSON.
//! Every group is `#[serde(default)]` and every field carries its own default,
//! so loading performs a shallow per-group merge against the built-in
//! defaults: an absent group takes its whole default block and a present
//! group's omitted keys fall back individually.

use crate::error::{Error, Result};
use crate::utils::expand_home;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Transfer behavior (destination, naming, retries, throttling)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Destination directory; a leading `~` is expanded (default: "~/Downloads/YouTube")
    #[serde(default = "default_save_path")]
    pub save_path: PathBuf,

    /// Engine output template (default: "%(title)s [%(id)s].%(ext)s")
    #[serde(default = "default_filename_template")]
    pub filename_template: String,

    /// Engine-side retry count for the whole transfer (default: 10)
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Engine-side retry count per fragment (default: 10)
    #[serde(default = "default_retries")]
    pub fragment_retries: u32,

    /// Fragments fetched concurrently by the engine (default: 5)
    #[serde(default = "default_concurrent_fragments")]
    pub concurrent_fragment_downloads: u32,

    /// Rate limit in engine syntax (`"50K"`, `"4.2M"`); `"0"` means unlimited
    #[serde(default = "default_limit_rate")]
    pub limit_rate: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            save_path: default_save_path(),
            filename_template: default_filename_template(),
            retries: default_retries(),
            fragment_retries: default_retries(),
            concurrent_fragment_downloads: default_concurrent_fragments(),
            limit_rate: default_limit_rate(),
        }
    }
}

impl DownloadConfig {
    /// Destination directory with `~` expanded
    pub fn resolved_save_path(&self) -> PathBuf {
        expand_home(&self.save_path)
    }
}

/// Side files written next to the media
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Keep the intermediate video after audio extraction
    #[serde(default)]
    pub keep_video: bool,

    /// Write the description to a `.description` file
    #[serde(default, alias = "writedescription")]
    pub write_description: bool,

    /// Write metadata to a `.info.json` file
    #[serde(default, alias = "writeinfojson")]
    pub write_info_json: bool,

    /// Write annotations (ignored by newer engine releases)
    #[serde(default, alias = "writeannotations")]
    pub write_annotations: bool,

    /// Write the thumbnail image (default: true)
    #[serde(default = "default_true", alias = "writethumbnail")]
    pub write_thumbnail: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            keep_video: false,
            write_description: false,
            write_info_json: false,
            write_annotations: false,
            write_thumbnail: true,
        }
    }
}

/// Subtitle download settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitlesConfig {
    /// Download uploaded subtitles (default: true)
    #[serde(default = "default_true", alias = "writesubtitles")]
    pub write_subtitles: bool,

    /// Download automatically generated subtitles
    #[serde(default, alias = "writeautomaticsub")]
    pub write_automatic_subs: bool,

    /// Subtitle languages (default: en, fa, ar)
    #[serde(default = "default_subtitle_languages", alias = "subtitleslangs")]
    pub languages: Vec<String>,

    /// Preferred subtitle formats, engine syntax (default: "srt/vtt")
    #[serde(default = "default_subtitle_format", alias = "subtitlesformat")]
    pub format: String,
}

impl Default for SubtitlesConfig {
    fn default() -> Self {
        Self {
            write_subtitles: true,
            write_automatic_subs: false,
            languages: default_subtitle_languages(),
            format: default_subtitle_format(),
        }
    }
}

/// Embedding of metadata, thumbnails and subtitles into the output container
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Embed tags into the output file (default: true)
    #[serde(default = "default_true")]
    pub embed_metadata: bool,

    /// Embed the thumbnail as cover art (default: true)
    #[serde(default = "default_true")]
    pub embed_thumbnail: bool,

    /// Embed subtitles into the container
    #[serde(default)]
    pub embed_subtitles: bool,

    /// Engine `--parse-metadata` expression; empty disables it
    #[serde(default)]
    pub parse_metadata: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            embed_metadata: true,
            embed_thumbnail: true,
            embed_subtitles: false,
            parse_metadata: String::new(),
        }
    }
}

/// Post-processing pipeline settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostProcessingConfig {
    /// Mark or remove sponsored segments (default: true)
    #[serde(default = "default_true")]
    pub use_sponsorblock: bool,

    /// Segment categories to mark as chapters (default: ["all"])
    #[serde(default = "default_sponsorblock_mark")]
    pub sponsorblock_mark: Vec<String>,

    /// Segment categories to cut out (default: ["sponsor"])
    #[serde(default = "default_sponsorblock_remove")]
    pub sponsorblock_remove: Vec<String>,

    /// Extract audio even for video selections
    #[serde(default)]
    pub extract_audio: bool,

    /// Default audio codec when a selection asks for `best` (default: "mp3")
    #[serde(default = "default_audio_format")]
    pub audio_format: String,

    /// Audio quality passed to the extractor (default: "192K")
    #[serde(default = "default_audio_quality")]
    pub audio_quality: String,
}

impl Default for PostProcessingConfig {
    fn default() -> Self {
        Self {
            use_sponsorblock: true,
            sponsorblock_mark: default_sponsorblock_mark(),
            sponsorblock_remove: default_sponsorblock_remove(),
            extract_audio: false,
            audio_format: default_audio_format(),
            audio_quality: default_audio_quality(),
        }
    }
}

/// Network options passed through to the engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Route traffic through `proxy_url`
    #[serde(default)]
    pub use_proxy: bool,

    /// Proxy URL (`http://host:port`, `socks5://host:port`)
    #[serde(default)]
    pub proxy_url: String,

    /// Socket timeout in seconds (default: 20)
    #[serde(default = "default_socket_timeout")]
    pub socket_timeout: u64,

    /// Local bind address; [`AUTO_SOURCE_ADDRESS`] or empty means unset
    #[serde(default = "default_source_address")]
    pub source_address: String,
}

/// Sentinel bind address meaning "let the OS choose"
pub const AUTO_SOURCE_ADDRESS: &str = "0.0.0.0";

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            use_proxy: false,
            proxy_url: String::new(),
            socket_timeout: default_socket_timeout(),
            source_address: default_source_address(),
        }
    }
}

/// Authentication: browser cookies and static or cookie-derived headers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationConfig {
    /// Read cookies from `cookie_browser`'s profile
    #[serde(default)]
    pub use_cookies: bool,

    /// Browser to read cookies from (default: "chrome")
    #[serde(default = "default_cookie_browser")]
    pub cookie_browser: String,

    /// Exported cookie file (JSON list of `{name, value}` objects); an empty
    /// string means unset
    #[serde(default, deserialize_with = "empty_path_as_none")]
    pub cookie_file_path: Option<PathBuf>,

    /// Send a static header preset
    #[serde(default)]
    pub use_custom_headers: bool,

    /// Header preset name (default: "Desktop")
    #[serde(default = "default_header_type")]
    pub custom_header_type: String,

    /// Derive headers from `cookie_file_path`; these win over the preset
    #[serde(default)]
    pub use_headers_from_cookies: bool,
}

impl Default for AuthenticationConfig {
    fn default() -> Self {
        Self {
            use_cookies: false,
            cookie_browser: default_cookie_browser(),
            cookie_file_path: None,
            use_custom_headers: false,
            custom_header_type: default_header_type(),
            use_headers_from_cookies: false,
        }
    }
}

/// Location of the external `yt-dlp` binary
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Whether to search PATH for yt-dlp if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            search_path: true,
        }
    }
}

/// Download history storage
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Database path (default: "./media-dl.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Main configuration for [`crate::QueueManager`]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Destination, naming, retries, throttling
    #[serde(default)]
    pub download: DownloadConfig,

    /// Side files
    #[serde(default)]
    pub output: OutputConfig,

    /// Subtitle download
    #[serde(default)]
    pub subtitles: SubtitlesConfig,

    /// Container embedding
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Post-processing pipeline
    #[serde(default, alias = "post-processing")]
    pub post_processing: PostProcessingConfig,

    /// Network pass-through
    #[serde(default)]
    pub network: NetworkConfig,

    /// Cookies and headers
    #[serde(default)]
    pub authentication: AuthenticationConfig,

    /// External engine binary
    #[serde(default)]
    pub engine: EngineConfig,

    /// History database
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Config {
    /// Load the configuration at `path`, falling back to defaults
    ///
    /// A missing or corrupt file is not an error: the problem is logged,
    /// the built-in defaults are written to `path` and returned.
    pub async fn load_or_init(path: &Path) -> Config {
        match Self::load(path).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "using default configuration"
                );
                let config = Config::default();
                if let Err(e) = config.save(path).await {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to write default configuration"
                    );
                }
                config
            }
        }
    }

    /// Load the configuration at `path`, reporting why it could not be used
    pub async fn load(path: &Path) -> Result<Config> {
        let load_error = |reason: String| Error::ConfigLoad {
            path: path.to_path_buf(),
            reason,
        };

        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| load_error(e.to_string()))?;
        serde_json::from_str(&contents).map_err(|e| load_error(e.to_string()))
    }

    /// Persist the configuration as pretty JSON, creating parent directories
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, message: &str| Error::Config {
            message: message.to_string(),
            key: Some(key.to_string()),
        };

        if self.download.filename_template.trim().is_empty() {
            return Err(invalid(
                "download.filename_template",
                "filename template must not be empty",
            ));
        }
        if self.download.concurrent_fragment_downloads == 0 {
            return Err(invalid(
                "download.concurrent_fragment_downloads",
                "at least one concurrent fragment download is required",
            ));
        }
        if self.network.socket_timeout == 0 {
            return Err(invalid(
                "network.socket_timeout",
                "socket timeout must be at least one second",
            ));
        }
        if self.network.use_proxy && self.network.proxy_url.trim().is_empty() {
            return Err(invalid(
                "network.proxy_url",
                "proxy is enabled but no proxy URL is configured",
            ));
        }
        if self.authentication.use_headers_from_cookies
            && self.authentication.cookie_file_path.is_none()
        {
            return Err(invalid(
                "authentication.cookie_file_path",
                "cookie-derived headers are enabled but no cookie file is configured",
            ));
        }
        Ok(())
    }
}

fn empty_path_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<PathBuf>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from))
}

fn default_true() -> bool {
    true
}

fn default_save_path() -> PathBuf {
    PathBuf::from("~/Downloads/YouTube")
}

fn default_filename_template() -> String {
    "%(title)s [%(id)s].%(ext)s".to_string()
}

fn default_retries() -> u32 {
    10
}

fn default_concurrent_fragments() -> u32 {
    5
}

fn default_limit_rate() -> String {
    "0".to_string()
}

fn default_subtitle_languages() -> Vec<String> {
    vec!["en".to_string(), "fa".to_string(), "ar".to_string()]
}

fn default_subtitle_format() -> String {
    "srt/vtt".to_string()
}

fn default_sponsorblock_mark() -> Vec<String> {
    vec!["all".to_string()]
}

fn default_sponsorblock_remove() -> Vec<String> {
    vec!["sponsor".to_string()]
}

fn default_audio_format() -> String {
    "mp3".to_string()
}

fn default_audio_quality() -> String {
    "192K".to_string()
}

fn default_socket_timeout() -> u64 {
    20
}

fn default_source_address() -> String {
    AUTO_SOURCE_ADDRESS.to_string()
}

fn default_cookie_browser() -> String {
    "chrome".to_string()
}

fn default_header_type() -> String {
    "Desktop".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./media-dl.db")
}
