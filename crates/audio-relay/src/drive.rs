//! Provider-specific URL and HTML parsing for Google Drive.
//!
//! Everything fragile lives here: the "view link to direct download"
//! rewrite and the scraping of the large-file confirmation interstitial.
//! The interstitial markup is undocumented and can change under us, so
//! the extraction is best-effort and the pipeline treats a `None` result
//! as "serve what we got". Keeping the parsing pure (no I/O) lets the
//! request pipeline stub it in tests.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::{HeaderMap, SET_COOKIE};
use url::Url;

/// File-id segment of a `/file/d/{id}/view` share link.
static FILE_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/file/d/([0-9A-Za-z_-]+)").expect("valid regex"));

/// Anchor carrying both the confirm token and the file id.
static CONFIRM_ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"href="[^"]*confirm=([0-9A-Za-z_-]+)[^"]*id=([0-9A-Za-z_-]+)"#)
        .expect("valid regex")
});

/// Standalone confirm token.
static CONFIRM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"confirm=([0-9A-Za-z_-]+)").expect("valid regex"));

/// Standalone file id.
static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"id=([0-9A-Za-z_-]+)").expect("valid regex"));

/// `filename=` / `filename*=UTF-8''` forms of Content-Disposition.
static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"filename\*=UTF-8''([^;\r\n]+)|filename="?([^;"\r\n]+)"#).expect("valid regex")
});

/// Parameters scraped from the provider's confirmation interstitial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// Anti-abuse confirmation token (`confirm=` parameter).
    pub token: String,
    /// File identifier (`id=` parameter).
    pub id: String,
}

/// Rewrites a Drive "view a file" link into the direct-download form.
///
/// `/file/d/{id}/view` paths and `?id={id}` query forms on Drive hosts
/// become `https://drive.google.com/uc?export=download&id={id}`. Any
/// other URL (including unparsable input) passes through unchanged.
pub fn to_direct_download_url(src: &str) -> String {
    let Ok(url) = Url::parse(src) else {
        return src.to_owned();
    };
    if !matches!(url.scheme(), "http" | "https") {
        return src.to_owned();
    }
    let host = url.host_str().unwrap_or_default();
    if host.contains("drive.google.com") || host.contains("docs.google.com") {
        let id = FILE_PATH_RE
            .captures(url.path())
            .map(|c| c[1].to_owned())
            .or_else(|| {
                url.query_pairs()
                    .find(|(k, _)| k == "id")
                    .map(|(_, v)| v.into_owned())
            });
        if let Some(id) = id {
            return format!("https://drive.google.com/uc?export=download&id={id}");
        }
    }
    src.to_owned()
}

/// Extracts the confirmation token and file id from interstitial HTML.
///
/// Tries the combined anchor pattern first, then independent searches
/// for `confirm=` and `id=`, finally falling back to `fallback_id`
/// (the `id` query parameter already present on the original target).
/// Returns `None` unless both values were found.
pub fn extract_confirmation(html: &str, fallback_id: Option<&str>) -> Option<Confirmation> {
    if let Some(caps) = CONFIRM_ANCHOR_RE.captures(html) {
        return Some(Confirmation {
            token: caps[1].to_owned(),
            id: caps[2].to_owned(),
        });
    }

    let token = CONFIRM_RE.captures(html).map(|c| c[1].to_owned())?;
    let id = ID_RE
        .captures(html)
        .map(|c| c[1].to_owned())
        .or_else(|| fallback_id.map(str::to_owned))?;

    Some(Confirmation { token, id })
}

/// Builds a `Cookie` header value from upstream `Set-Cookie` headers.
///
/// Only the leading `name=value` pair of each cookie is kept; attributes
/// (path, expiry, ...) are dropped. Returns `None` when the response set
/// no cookies.
pub fn cookie_header_from(headers: &HeaderMap) -> Option<String> {
    let pairs: Vec<&str> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

/// Pulls a filename out of a `Content-Disposition` header value.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    let caps = FILENAME_RE.captures(value)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_owned())
}
