//! Command-line construction for `yt-dlp`

use super::parser::{METADATA_MARKER, POSTPROCESS_MARKER, TRANSFER_MARKER};
use crate::resolver::{EngineParams, PostProcessor};

/// Fields requested from the transfer hook, in template order
pub(crate) const TRANSFER_FIELDS: &[&str] = &[
    "status",
    "downloaded_bytes",
    "total_bytes",
    "total_bytes_estimate",
    "speed",
    "eta",
];

/// Fields requested from the post-processing hook, in template order
pub(crate) const POSTPROCESS_FIELDS: &[&str] = &["status", "postprocessor"];

fn progress_template(hook: &str, marker: &str, fields: &[&str]) -> String {
    let body = fields
        .iter()
        .map(|f| format!("%(progress.{f})s"))
        .collect::<Vec<_>>()
        .join("|");
    format!("{hook}:{marker}{body}")
}

/// Build the full argument vector for one invocation (URL last)
pub fn build_args(params: &EngineParams) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let mut push = |flag: &str, value: Option<String>| {
        args.push(flag.to_string());
        if let Some(value) = value {
            args.push(value);
        }
    };

    // Machine-readable progress and metadata
    push("--newline", None);
    push("--progress", None);
    push("--no-colors", None);
    push("--no-playlist", None);
    push(
        "--progress-template",
        Some(progress_template("download", TRANSFER_MARKER, TRANSFER_FIELDS)),
    );
    push(
        "--progress-template",
        Some(progress_template(
            "postprocess",
            POSTPROCESS_MARKER,
            POSTPROCESS_FIELDS,
        )),
    );
    push(
        "--print",
        Some(format!(
            "after_move:{METADATA_MARKER}%(.{{id,title,webpage_url,uploader,duration,format,resolution,filepath,filesize,filesize_approx}})j"
        )),
    );

    push("--format", Some(params.format_selector.clone()));
    push(
        "--output",
        Some(params.output_template.to_string_lossy().into_owned()),
    );
    if let Some(container) = &params.merge_output_format {
        push("--merge-output-format", Some(container.clone()));
    }

    for step in &params.post_processors {
        match step {
            PostProcessor::ExtractAudio { codec, quality } => {
                push("--extract-audio", None);
                push("--audio-format", Some(codec.clone()));
                push("--audio-quality", Some(quality.clone()));
            }
            PostProcessor::RemuxVideo { format } => {
                push("--remux-video", Some(format.clone()));
            }
            PostProcessor::EmbedThumbnail => push("--embed-thumbnail", None),
            PostProcessor::EmbedSubtitles => push("--embed-subs", None),
            PostProcessor::SponsorBlock { mark, remove } => {
                if !mark.is_empty() {
                    push("--sponsorblock-mark", Some(mark.join(",")));
                }
                if !remove.is_empty() {
                    push("--sponsorblock-remove", Some(remove.join(",")));
                }
            }
        }
    }

    let transfer = &params.transfer;
    push("--retries", Some(transfer.retries.to_string()));
    push(
        "--fragment-retries",
        Some(transfer.fragment_retries.to_string()),
    );
    push(
        "--concurrent-fragments",
        Some(transfer.concurrent_fragments.to_string()),
    );
    if let Some(rate) = &transfer.rate_limit {
        push("--limit-rate", Some(rate.clone()));
    }

    // write_annotations has no effect on current yt-dlp releases and is not forwarded
    let output = &params.output;
    if output.write_subtitles {
        push("--write-subs", None);
    }
    if output.write_automatic_subs {
        push("--write-auto-subs", None);
    }
    let wants_subtitles = output.write_subtitles
        || output.write_automatic_subs
        || params
            .post_processors
            .contains(&PostProcessor::EmbedSubtitles);
    if wants_subtitles {
        if !output.subtitle_languages.is_empty() {
            push("--sub-langs", Some(output.subtitle_languages.join(",")));
        }
        if !output.subtitle_format.is_empty() {
            push("--sub-format", Some(output.subtitle_format.clone()));
        }
    }
    if output.write_description {
        push("--write-description", None);
    }
    if output.write_info_json {
        push("--write-info-json", None);
    }
    if output.write_thumbnail {
        push("--write-thumbnail", None);
    }
    if output.keep_video {
        push("--keep-video", None);
    }
    if output.embed_metadata {
        push("--embed-metadata", None);
    }
    if let Some(expr) = &output.parse_metadata {
        push("--parse-metadata", Some(expr.clone()));
    }

    let network = &params.network;
    if let Some(proxy) = &network.proxy {
        push("--proxy", Some(proxy.clone()));
    }
    push(
        "--socket-timeout",
        Some(network.socket_timeout_secs.to_string()),
    );
    if let Some(addr) = &network.source_address {
        push("--source-address", Some(addr.clone()));
    }

    if let Some(browser) = &params.auth.cookies_from_browser {
        push("--cookies-from-browser", Some(browser.clone()));
    }
    for (name, value) in &params.auth.http_headers {
        push("--add-header", Some(format!("{name}:{value}")));
    }

    for extractor_arg in &params.extractor_args {
        push("--extractor-args", Some(extractor_arg.clone()));
    }

    args.push("--".to_string());
    args.push(params.url.clone());
    args
}

/// Arguments for describing one URL as a single JSON document
pub fn build_probe_args(url: &str) -> Vec<String> {
    ["--dump-single-json", "--no-playlist", "--skip-download", "--no-warnings", "--no-colors", "--", url]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Arguments for listing a playlist's entries without resolving each one
pub fn build_playlist_probe_args(url: &str) -> Vec<String> {
    ["--dump-single-json", "--flat-playlist", "--skip-download", "--no-warnings", "--no-colors", "--", url]
        .into_iter()
        .map(str::to_string)
        .collect()
}
