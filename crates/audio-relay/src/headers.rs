//! Outbound header projection and content-type inference.
//!
//! The response to the caller never forwards upstream headers as-is.
//! Instead a fixed projection table declares, per header, whether the
//! upstream value passes through, gets a default, or is overridden.
//! Anything not in the table is dropped, which keeps provider cookies
//! and server fingerprints (`set-cookie`, `x-powered-by`, ...) from
//! leaking to the browser.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE};

use crate::drive;

/// How a projected header derives its value.
#[derive(Debug, Clone, Copy)]
pub enum HeaderRule {
    /// Copy the upstream value when present.
    Forward,
    /// Copy the upstream value, or fall back to a fixed default.
    ForwardOr(&'static str),
    /// Always emit the fixed value, ignoring upstream.
    Force(&'static str),
}

/// The full set of headers the proxy may emit.
///
/// `accept-ranges` defaults to `bytes` because the proxy always attempts
/// range support; `cache-control` is forced to `no-store` so shared
/// caches never interfere with range-based streaming.
pub const PROJECTION: &[(&str, HeaderRule)] = &[
    ("content-type", HeaderRule::Forward),
    ("content-length", HeaderRule::Forward),
    ("content-range", HeaderRule::Forward),
    ("accept-ranges", HeaderRule::ForwardOr("bytes")),
    ("cache-control", HeaderRule::Force("no-store")),
    ("last-modified", HeaderRule::Forward),
];

/// Projects upstream response headers through [`PROJECTION`].
pub fn project(upstream: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for &(name, rule) in PROJECTION {
        let name = HeaderName::from_static(name);
        match rule {
            HeaderRule::Forward => {
                if let Some(value) = upstream.get(&name) {
                    out.insert(name, value.clone());
                }
            }
            HeaderRule::ForwardOr(default) => {
                let value = upstream
                    .get(&name)
                    .cloned()
                    .unwrap_or_else(|| HeaderValue::from_static(default));
                out.insert(name, value);
            }
            HeaderRule::Force(value) => {
                out.insert(name, HeaderValue::from_static(value));
            }
        }
    }
    out
}

/// Maps well-known audio file extensions to a playable content type.
fn audio_type_for(filename: &str) -> Option<&'static str> {
    const EXTENSIONS: &[(&str, &str)] = &[
        (".m4a", "audio/mp4"),
        (".mp4", "audio/mp4"),
        (".mp3", "audio/mpeg"),
        (".wav", "audio/wav"),
        (".ogg", "audio/ogg"),
        (".aac", "audio/aac"),
    ];
    let lower = filename.to_ascii_lowercase();
    EXTENSIONS
        .iter()
        .find(|(ext, _)| lower.ends_with(ext))
        .map(|(_, mime)| *mime)
}

/// Improves a generic content-type using the upstream download filename.
///
/// Drive serves audio as `application/octet-stream` with the real name
/// in `Content-Disposition`; browsers refuse to play that, so map common
/// audio extensions back onto the content type. Unrecognized extensions
/// leave the header untouched.
pub fn refine_content_type(out: &mut HeaderMap, upstream: &HeaderMap) {
    let current = out
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !current.is_empty() && current != "application/octet-stream" {
        return;
    }

    let Some(disposition) = upstream
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
    else {
        return;
    };
    let Some(filename) = drive::filename_from_disposition(disposition) else {
        return;
    };

    if let Some(mime) = audio_type_for(&filename) {
        out.insert(CONTENT_TYPE, HeaderValue::from_static(mime));
    }
}
