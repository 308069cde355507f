//! Unified configuration for the `audio-relay` crate.
//!
//! A single flattened settings struct covers all knobs of the resolver
//! pipeline:
//! - outbound request identity (user agent, referer)
//! - the host allow-list (the sole security boundary)
//! - provider detection and the confirmation endpoint
//!
//! The provider-related fields default to the Google Drive domains the
//! proxy was built for; tests override them to point at local fixture
//! servers.

use std::time::Duration;

use url::Url;

/// Default user agent forwarded upstream when the caller sends none.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

/// Referer the provider expects on download requests.
pub const DEFAULT_REFERER: &str = "https://drive.google.com/";

/// The provider's direct-download endpoint.
pub const DEFAULT_CONFIRM_ENDPOINT: &str = "https://drive.google.com/uc";

/// Unified settings for the resolver pipeline.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// User agent sent upstream when the caller did not supply one.
    pub user_agent: String,

    /// Fixed referer attached to every outbound request.
    pub referer: String,

    /// Hostnames the proxy is permitted to contact (exact or subdomain
    /// match). Anything else is rejected before any outbound fetch.
    pub allowed_hosts: Vec<String>,

    /// Hosts treated as the cloud-storage provider, i.e. subject to the
    /// interstitial-confirmation and late-range-retry handling.
    pub provider_hosts: Vec<String>,

    /// Base URL of the provider's direct-download endpoint used for the
    /// confirmation follow-up request.
    pub confirm_endpoint: Url,

    /// Connect timeout for outbound requests.
    ///
    /// There is deliberately no total request timeout: response bodies
    /// are streamed to the caller and must not be cut off mid-file.
    pub connect_timeout: Duration,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            referer: DEFAULT_REFERER.to_owned(),
            allowed_hosts: vec![
                "drive.google.com".to_owned(),
                "docs.google.com".to_owned(),
                // Redirects often land on these.
                "googleusercontent.com".to_owned(),
                "content.googleapis.com".to_owned(),
            ],
            provider_hosts: vec!["drive.google.com".to_owned(), "docs.google.com".to_owned()],
            confirm_endpoint: Url::parse(DEFAULT_CONFIRM_ENDPOINT)
                .expect("default confirm endpoint must parse"),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl RelaySettings {
    /// Adds a hostname to the allow-list.
    pub fn with_allowed_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_hosts.push(host.into());
        self
    }

    /// Replaces the provider host list.
    pub fn with_provider_hosts(mut self, hosts: Vec<String>) -> Self {
        self.provider_hosts = hosts;
        self
    }

    /// Replaces the confirmation endpoint.
    pub fn with_confirm_endpoint(mut self, endpoint: Url) -> Self {
        self.confirm_endpoint = endpoint;
        self
    }

    /// Overrides the default user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Overrides the outbound connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
