//! Configuration resolution: persisted config + per-item selection -> engine parameters
//!
//! [`ConfigResolver::resolve`] is deterministic and side-effect free. Anything
//! that touches the outside world (reading the cookie file, creating the save
//! directory) happens in the run loop before or after resolution.

use crate::auth::{HttpHeaders, header_preset};
use crate::config::{AUTO_SOURCE_ADDRESS, Config};
use crate::types::{ItemSelection, Quality};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Containers the engine can merge into directly; anything else needs a remux step
pub const STANDARD_CONTAINERS: &[&str] = &["mp4", "mkv", "webm"];

/// One post-processing step, in pipeline order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostProcessor {
    /// Convert to an audio-only file
    ExtractAudio {
        /// Target codec (`mp3`, `opus`, `flac`, ...)
        codec: String,
        /// Target quality (`192K`, `0`..`10`)
        quality: String,
    },
    /// Remux (or re-encode) into a non-standard container
    RemuxVideo {
        /// Target container (`avi`, `mov`, `flv`, ...)
        format: String,
    },
    /// Embed the thumbnail as cover art
    EmbedThumbnail,
    /// Embed subtitles into the container
    EmbedSubtitles,
    /// Mark and/or remove sponsored segments
    SponsorBlock {
        /// Categories marked as chapters
        mark: Vec<String>,
        /// Categories cut out
        remove: Vec<String>,
    },
}

/// Network options passed through to the engine
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkOptions {
    /// Proxy URL, if enabled
    pub proxy: Option<String>,
    /// Socket timeout in seconds
    pub socket_timeout_secs: u64,
    /// Local bind address; `None` lets the OS choose
    pub source_address: Option<String>,
}

/// Authentication options
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthOptions {
    /// Browser whose cookie store the engine should read
    pub cookies_from_browser: Option<String>,
    /// Extra request headers
    pub http_headers: HttpHeaders,
}

/// Engine-side retry and throttling options
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOptions {
    /// Whole-transfer retries
    pub retries: u32,
    /// Per-fragment retries
    pub fragment_retries: u32,
    /// Fragments fetched concurrently
    pub concurrent_fragments: u32,
    /// Rate limit in engine syntax; `None` means unlimited
    pub rate_limit: Option<String>,
}

/// Side files and embedding options
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputOptions {
    /// Download uploaded subtitles
    pub write_subtitles: bool,
    /// Download generated subtitles
    pub write_automatic_subs: bool,
    /// Subtitle languages
    pub subtitle_languages: Vec<String>,
    /// Subtitle format preference
    pub subtitle_format: String,
    /// Write `.description`
    pub write_description: bool,
    /// Write `.info.json`
    pub write_info_json: bool,
    /// Write annotations
    pub write_annotations: bool,
    /// Write the thumbnail image
    pub write_thumbnail: bool,
    /// Keep the intermediate video after audio extraction
    pub keep_video: bool,
    /// Embed tags
    pub embed_metadata: bool,
    /// Metadata parsing expression
    pub parse_metadata: Option<String>,
}

/// Fully resolved parameters for one engine invocation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineParams {
    /// Source URL
    pub url: String,
    /// Format selection expression
    pub format_selector: String,
    /// Destination directory
    pub save_dir: PathBuf,
    /// Output path template (`save_dir` joined with the filename template)
    pub output_template: PathBuf,
    /// Container to merge into, for standard containers
    pub merge_output_format: Option<String>,
    /// Post-processing pipeline, in execution order
    pub post_processors: Vec<PostProcessor>,
    /// Retry/throttling options
    pub transfer: TransferOptions,
    /// Side files and embedding
    pub output: OutputOptions,
    /// Network pass-through
    pub network: NetworkOptions,
    /// Cookies and headers
    pub auth: AuthOptions,
    /// Extractor-specific arguments (`extractor:key=value`)
    pub extractor_args: Vec<String>,
}

impl EngineParams {
    /// Whether the engine will read browser cookies
    pub fn uses_browser_cookies(&self) -> bool {
        self.auth.cookies_from_browser.is_some()
    }

    /// The same parameters with browser-cookie authentication removed
    pub fn without_cookies(&self) -> EngineParams {
        let mut params = self.clone();
        params.auth.cookies_from_browser = None;
        params
    }
}

/// Maps the global configuration and a per-item selection to [`EngineParams`]
#[derive(Clone, Debug)]
pub struct ConfigResolver {
    config: Arc<Config>,
}

impl ConfigResolver {
    /// Create a resolver over a shared configuration
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// The configuration this resolver reads
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve parameters for one item
    ///
    /// `cookie_headers` are headers already derived from the cookie file for
    /// this run; they override the static preset key by key.
    pub fn resolve(
        &self,
        url: &str,
        selection: &ItemSelection,
        cookie_headers: Option<&HttpHeaders>,
    ) -> EngineParams {
        let config = &*self.config;
        let save_dir = config.download.resolved_save_path();
        let output_template = save_dir.join(&config.download.filename_template);

        let audio_only = selection.quality.is_audio_only();
        let format_selector = format_selector(selection);
        let format = selection.format.trim();

        let mut post_processors = Vec::new();
        let mut merge_output_format = None;

        if audio_only || config.post_processing.extract_audio {
            post_processors.push(PostProcessor::ExtractAudio {
                codec: audio_codec(config, selection),
                quality: config.post_processing.audio_quality.clone(),
            });
        }

        if !audio_only && !format.is_empty() {
            if STANDARD_CONTAINERS.contains(&format) {
                merge_output_format = Some(format.to_string());
            } else {
                post_processors.push(PostProcessor::RemuxVideo {
                    format: format.to_string(),
                });
            }
        }

        if config.metadata.embed_thumbnail {
            post_processors.push(PostProcessor::EmbedThumbnail);
        }
        if config.metadata.embed_subtitles {
            post_processors.push(PostProcessor::EmbedSubtitles);
        }
        if config.post_processing.use_sponsorblock {
            post_processors.push(PostProcessor::SponsorBlock {
                mark: config.post_processing.sponsorblock_mark.clone(),
                remove: config.post_processing.sponsorblock_remove.clone(),
            });
        }

        let limit_rate = config.download.limit_rate.trim();
        let transfer = TransferOptions {
            retries: config.download.retries,
            fragment_retries: config.download.fragment_retries,
            concurrent_fragments: config.download.concurrent_fragment_downloads,
            rate_limit: non_empty(limit_rate).filter(|rate| *rate != "0"),
        };

        let output = OutputOptions {
            write_subtitles: config.subtitles.write_subtitles,
            write_automatic_subs: config.subtitles.write_automatic_subs,
            subtitle_languages: config.subtitles.languages.clone(),
            subtitle_format: config.subtitles.format.clone(),
            write_description: config.output.write_description,
            write_info_json: config.output.write_info_json,
            write_annotations: config.output.write_annotations,
            write_thumbnail: config.output.write_thumbnail,
            keep_video: config.output.keep_video,
            embed_metadata: config.metadata.embed_metadata,
            parse_metadata: non_empty(&config.metadata.parse_metadata),
        };

        let network = NetworkOptions {
            proxy: config
                .network
                .use_proxy
                .then(|| non_empty(&config.network.proxy_url))
                .flatten(),
            socket_timeout_secs: config.network.socket_timeout,
            source_address: non_empty(&config.network.source_address)
                .filter(|addr| addr != AUTO_SOURCE_ADDRESS),
        };

        let auth_config = &config.authentication;
        let mut http_headers = HttpHeaders::new();
        if auth_config.use_custom_headers
            && let Some(preset) = header_preset(&auth_config.custom_header_type)
        {
            http_headers.extend(preset);
        }
        if let Some(headers) = cookie_headers {
            http_headers.extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let auth = AuthOptions {
            cookies_from_browser: auth_config
                .use_cookies
                .then(|| non_empty(&auth_config.cookie_browser))
                .flatten(),
            http_headers,
        };

        EngineParams {
            url: url.to_string(),
            format_selector,
            save_dir,
            output_template,
            merge_output_format,
            post_processors,
            transfer,
            output,
            network,
            auth,
            extractor_args: vec!["youtube:player_client=default".to_string()],
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn is_best(choice: &str) -> bool {
    let choice = choice.trim();
    choice.is_empty() || choice.eq_ignore_ascii_case("best")
}

/// Format-selection expression for a selection
///
/// A specific audio choice is tried first and falls back to the best audio
/// track.
fn format_selector(selection: &ItemSelection) -> String {
    let audio = selection.audio.trim();
    let preferred_audio = (!is_best(audio)).then(|| format!("bestaudio[acodec^={audio}]"));

    match selection.quality {
        Quality::AudioOnly => match preferred_audio {
            Some(preferred) => format!("{preferred}/bestaudio/best"),
            None => "bestaudio/best".to_string(),
        },
        Quality::Height(h) => {
            let video = format!("bestvideo[height<={h}]");
            let fallback = format!("{video}+bestaudio/best[height<={h}]");
            match preferred_audio {
                Some(preferred) => format!("{video}+{preferred}/{fallback}"),
                None => fallback,
            }
        }
    }
}

/// Codec for audio extraction
///
/// Audio-only items name their codec in the format choice (`best` defers to
/// the configured default). Video items carry a container there, so explicit
/// extraction always uses the configured codec.
fn audio_codec(config: &Config, selection: &ItemSelection) -> String {
    let format = selection.format.trim();
    if selection.quality.is_audio_only() && !is_best(format) {
        format.to_string()
    } else {
        config.post_processing.audio_format.clone()
    }
}
