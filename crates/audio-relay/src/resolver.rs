//! The resolver request pipeline.
//!
//! One linear pipeline with named stages:
//!
//! ```text
//! Normalize -> Validate -> Fetch -> MaybeConfirm -> MaybeRangeRetry -> Project
//! ```
//!
//! The working state between stages is an explicit [`Attempt`] value
//! carrying the current upstream response, the URL it came from, the
//! accumulated cookie header, and whether the caller's range has been
//! applied yet.
//!
//! Failure policy: every provider-specific step (cookie capture, token
//! extraction, confirmation fetch, late range retry) degrades to "serve
//! the best response obtained so far". Only validation failures and an
//! error on the initial fetch surface as [`RelayError`]s. This is a
//! best-effort scraper against an undocumented interstitial, not a
//! robust protocol client, so there are no retries beyond the two
//! purpose-built follow-up requests.

use std::fmt;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE, COOKIE, RANGE, REFERER, USER_AGENT};
use reqwest::{redirect, Client, Response, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::allowlist::AllowList;
use crate::drive;
use crate::error::{RelayError, RelayResult};
use crate::headers;
use crate::settings::RelaySettings;

/// A boxed stream of response body chunks.
pub type RelayByteStream = BoxStream<'static, Result<Bytes, RelayError>>;

/// The resolved result handed back to the HTTP layer: upstream status,
/// projected headers, and the (unbuffered) body stream.
pub struct ResolvedMedia {
    /// Status mirrored from the final upstream response (200, 206, ...).
    pub status: StatusCode,
    /// Headers projected through the allow-list table.
    pub headers: HeaderMap,
    /// Body bytes, streamed through without buffering.
    pub body: RelayByteStream,
}

// Manual impl: the boxed body stream has no Debug.
impl fmt::Debug for ResolvedMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedMedia")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Working state threaded through the pipeline stages.
struct Attempt {
    /// URL the current response was fetched from (pre-redirect target).
    url: Url,
    response: Response,
    /// Cookie header accumulated from upstream `Set-Cookie` values.
    cookies: Option<String>,
    /// Whether the caller's range header was attached to this response.
    range_applied: bool,
}

impl Attempt {
    fn new(url: Url, response: Response, range_applied: bool) -> Self {
        let mut attempt = Self {
            url,
            response,
            cookies: None,
            range_applied,
        };
        attempt.capture_cookies();
        attempt
    }

    /// Refreshes the accumulated cookie header from the current response.
    fn capture_cookies(&mut self) {
        if let Some(cookies) = drive::cookie_header_from(self.response.headers()) {
            self.cookies = Some(cookies);
        }
    }

    fn content_type(&self) -> &str {
        self.response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    /// A provider response is the large-file confirmation page when it
    /// comes back as HTML on a download/file path.
    fn is_interstitial(&self) -> bool {
        self.content_type().contains("text/html")
            && (self.url.path().starts_with("/uc") || self.url.path().starts_with("/file"))
    }

    /// Whether the body looks like file content rather than markup.
    fn is_binary(&self) -> bool {
        let ct = self.content_type();
        ct.starts_with("audio/") || ct == "application/octet-stream" || ct.contains("video/mp4")
    }
}

/// Stateless remote audio resolver.
///
/// Holds only a shared HTTP client and settings; every call to
/// [`Resolver::resolve`] is independent. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Resolver {
    client: Client,
    settings: RelaySettings,
    allow: AllowList,
}

impl Resolver {
    /// Creates a resolver with a fresh HTTP client.
    pub fn new(settings: RelaySettings) -> RelayResult<Self> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .redirect(redirect::Policy::limited(10))
            .build()
            .map_err(|e| RelayError::upstream(format!("failed to build HTTP client: {e}")))?;
        let allow = AllowList::new(settings.allowed_hosts.clone());
        Ok(Self {
            client,
            settings,
            allow,
        })
    }

    /// Settings this resolver was built with.
    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// Resolves a source URL into a playable byte stream.
    ///
    /// `range` and `user_agent` are the caller's inbound header values,
    /// forwarded upstream as described in the module docs.
    pub async fn resolve(
        &self,
        src: &str,
        range: Option<&str>,
        user_agent: Option<&str>,
    ) -> RelayResult<ResolvedMedia> {
        // Normalize
        let normalized = drive::to_direct_download_url(src);
        let target = Url::parse(&normalized).map_err(|_| RelayError::InvalidUrl)?;
        if !matches!(target.scheme(), "http" | "https") {
            return Err(RelayError::InvalidUrl);
        }

        // Validate (before any outbound fetch)
        if !self.allow.permits(&target) {
            return Err(RelayError::HostNotAllowed(
                target.host_str().unwrap_or_default().to_owned(),
            ));
        }

        let is_provider = self.is_provider_host(&target);

        // Fetch. The provider's interstitial does not support partial
        // content, so the caller's range is withheld on the first
        // attempt against provider hosts and applied later.
        let first_range = if is_provider { None } else { range };
        debug!(url = %target, provider = is_provider, range = ?first_range, "first fetch");
        let response = self
            .fetch(target.clone(), user_agent, first_range, None)
            .await
            .map_err(|e| RelayError::upstream(format!("initial fetch failed: {e}")))?;

        let mut attempt = Attempt::new(target, response, first_range.is_some());

        // MaybeConfirm
        if is_provider && attempt.is_interstitial() {
            return self.confirm_and_project(attempt, range, user_agent).await;
        }

        // MaybeRangeRetry
        if is_provider {
            self.maybe_range_retry(&mut attempt, range, user_agent).await;
        }

        Ok(Self::project(attempt))
    }

    fn is_provider_host(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        self.settings
            .provider_hosts
            .iter()
            .any(|p| host == p || host.ends_with(&format!(".{p}")))
    }

    /// Single outbound GET with the fixed request identity.
    async fn fetch(
        &self,
        url: Url,
        user_agent: Option<&str>,
        range: Option<&str>,
        cookies: Option<&str>,
    ) -> reqwest::Result<Response> {
        let mut request = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent.unwrap_or(&self.settings.user_agent))
            .header(REFERER, self.settings.referer.as_str())
            .header(ACCEPT, "*/*");
        if let Some(range) = range {
            request = request.header(RANGE, range);
        }
        if let Some(cookies) = cookies {
            request = request.header(COOKIE, cookies);
        }
        request.send().await
    }

    /// MaybeConfirm stage: scrape the interstitial and re-fetch with the
    /// confirmation token. Consumes the attempt because the interstitial
    /// body must be read as text.
    ///
    /// When extraction or the follow-up fetch fails, the HTML itself is
    /// served; the caller detects the degraded outcome by content-type.
    async fn confirm_and_project(
        &self,
        attempt: Attempt,
        range: Option<&str>,
        user_agent: Option<&str>,
    ) -> RelayResult<ResolvedMedia> {
        let Attempt {
            url, response, cookies, ..
        } = attempt;

        let status = response.status();
        let upstream_headers = response.headers().clone();
        let fallback_id = url
            .query_pairs()
            .find(|(k, _)| k == "id")
            .map(|(_, v)| v.into_owned());

        let html = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!(url = %url, "failed to read interstitial body: {e}");
                String::new()
            }
        };

        if let Some(confirmation) = drive::extract_confirmation(&html, fallback_id.as_deref()) {
            let mut confirm_url = self.settings.confirm_endpoint.clone();
            confirm_url
                .query_pairs_mut()
                .append_pair("export", "download")
                .append_pair("id", &confirmation.id)
                .append_pair("confirm", &confirmation.token);

            debug!(url = %confirm_url, "following interstitial confirmation");
            match self
                .fetch(confirm_url.clone(), user_agent, range, cookies.as_deref())
                .await
            {
                Ok(response) => {
                    let next = Attempt {
                        url: confirm_url,
                        response,
                        cookies,
                        range_applied: range.is_some(),
                    };
                    return Ok(Self::project(next));
                }
                Err(e) => {
                    warn!(url = %confirm_url, "confirmation fetch failed, serving interstitial: {e}");
                }
            }
        } else {
            debug!(url = %url, "no confirmation token found in interstitial");
        }

        // Degraded outcome: the body was already consumed for parsing,
        // so hand the HTML back under the projected headers.
        let mut headers = headers::project(&upstream_headers);
        headers::refine_content_type(&mut headers, &upstream_headers);
        let body =
            futures_util::stream::once(async move { Ok::<_, RelayError>(Bytes::from(html)) })
                .boxed();
        Ok(ResolvedMedia {
            status,
            headers,
            body,
        })
    }

    /// MaybeRangeRetry stage: when the provider served binary content
    /// without the caller's range applied (no interstitial round-trip),
    /// reissue the request with the range so seeking works.
    async fn maybe_range_retry(
        &self,
        attempt: &mut Attempt,
        range: Option<&str>,
        user_agent: Option<&str>,
    ) {
        let Some(range) = range else { return };
        if attempt.range_applied || !attempt.is_binary() {
            return;
        }

        debug!(url = %attempt.url, range, "re-issuing request with range for seek support");
        match self
            .fetch(
                attempt.url.clone(),
                user_agent,
                Some(range),
                attempt.cookies.as_deref(),
            )
            .await
        {
            Ok(response) => {
                attempt.response = response;
                attempt.range_applied = true;
                attempt.capture_cookies();
            }
            Err(e) => {
                warn!(url = %attempt.url, "range retry failed, serving unranged response: {e}");
            }
        }
    }

    /// Project stage: allow-listed headers plus the pass-through body.
    fn project(attempt: Attempt) -> ResolvedMedia {
        let status = attempt.response.status();
        let upstream_headers = attempt.response.headers().clone();

        let mut headers = headers::project(&upstream_headers);
        headers::refine_content_type(&mut headers, &upstream_headers);

        let body = attempt
            .response
            .bytes_stream()
            .map_err(|e| RelayError::upstream(format!("stream read error: {e}")))
            .boxed();

        ResolvedMedia {
            status,
            headers,
            body,
        }
    }
}
