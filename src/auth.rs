//! HTTP header sources for authenticated downloads
//!
//! Two sources feed the engine's request headers:
//! - static presets that impersonate a device or browser
//! - headers derived from an exported cookie file
//!
//! Cookie files are read once per run, outside the (pure) resolver. A file
//! that cannot be read or parsed is logged and treated as "no headers".

use crate::config::AuthenticationConfig;
use crate::error::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Header name to value, ordered so argv construction is deterministic
pub type HttpHeaders = BTreeMap<String, String>;

/// Names of the built-in header presets, in display order
pub const HEADER_PRESETS: &[&str] = &[
    "Desktop",
    "Android",
    "iOS",
    "TV",
    "Chrome",
    "Firefox",
    "Safari",
    "Edge",
    "Samsung Smart TV",
    "Roku",
];

const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// Cookies whose values are forwarded as `X-<name>` headers
const FORWARDED_COOKIES: &[&str] = &["PSID", "SSID", "APISID", "SAPISID"];

fn preset_user_agent(name: &str) -> Option<&'static str> {
    let ua = match name {
        "Desktop" | "Chrome" => CHROME_USER_AGENT,
        "Android" => {
            "Mozilla/5.0 (Linux; Android 13; SM-G991B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Mobile Safari/537.36"
        }
        "iOS" => {
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1"
        }
        "TV" => {
            "Mozilla/5.0 (CrKey armv7l 1.54.110279) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36"
        }
        "Firefox" => {
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0"
        }
        "Safari" => {
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15"
        }
        "Edge" => {
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36 Edg/121.0.0.0"
        }
        "Samsung Smart TV" => {
            "Mozilla/5.0 (SmartTV; Tizen 6.0) AppleWebKit/537.36 (KHTML, like Gecko) SamsungBrowser/16.0 Chrome/96.0.4664.45 TV Safari/537.36"
        }
        "Roku" => "Mozilla/5.0 (Roku/DVP-7.70 (297.70E04154A)) Gecko/20100101 Firefox/108.0",
        _ => return None,
    };
    Some(ua)
}

/// Static header set for a device/browser preset
///
/// Returns `None` for unknown preset names.
pub fn header_preset(name: &str) -> Option<HttpHeaders> {
    preset_user_agent(name)
        .map(|ua| HttpHeaders::from([("User-Agent".to_string(), ua.to_string())]))
}

#[derive(Deserialize)]
struct ExportedCookie {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

/// Derive request headers from an exported cookie file's JSON contents
///
/// Session cookies are forwarded as `X-<name>` headers and a Chrome-like set
/// of browser headers is always added. A document that is not a list of
/// cookies contributes only the browser headers.
pub fn cookie_headers_from_json(contents: &str) -> Result<HttpHeaders> {
    let document: serde_json::Value = serde_json::from_str(contents)?;
    let mut headers = HttpHeaders::new();

    if document.is_array() {
        let cookies: Vec<ExportedCookie> = serde_json::from_value(document)?;
        for cookie in cookies {
            if let Some(name) = cookie.name
                && FORWARDED_COOKIES.contains(&name.as_str())
            {
                headers.insert(format!("X-{name}"), cookie.value.unwrap_or_default());
            }
        }
    }

    for (key, value) in [
        ("User-Agent", CHROME_USER_AGENT),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Accept-Encoding", "gzip, deflate, br"),
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "none"),
    ] {
        headers.insert(key.to_string(), value.to_string());
    }

    Ok(headers)
}

/// Read the cookie file and derive headers from it
pub async fn read_cookie_headers(path: &Path) -> Result<HttpHeaders> {
    let contents = tokio::fs::read_to_string(path).await?;
    cookie_headers_from_json(&contents)
}

/// Cookie-derived headers for a run, if enabled and readable
///
/// Returns `None` when the feature is disabled, no cookie file is
/// configured, or the file cannot be used (the failure is logged).
pub async fn load_cookie_headers(auth: &AuthenticationConfig) -> Option<HttpHeaders> {
    if !auth.use_headers_from_cookies {
        return None;
    }
    let path = auth.cookie_file_path.as_deref()?;

    match read_cookie_headers(path).await {
        Ok(headers) => {
            tracing::debug!(
                path = %path.display(),
                header_count = headers.len(),
                "derived headers from cookie file"
            );
            Some(headers)
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to extract headers from cookie file"
            );
            None
        }
    }
}
