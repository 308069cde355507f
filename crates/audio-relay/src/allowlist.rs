//! Hostname allow-list.
//!
//! The allow-list is the proxy's only security boundary: it bounds the
//! set of hosts the resolver will ever contact, so the endpoint cannot
//! be used as an open relay to arbitrary servers. The check runs before
//! any outbound fetch.

use url::Url;

/// Fixed set of hostnames the resolver may contact.
#[derive(Debug, Clone)]
pub struct AllowList {
    hosts: Vec<String>,
}

impl AllowList {
    /// Creates an allow-list over the given hostnames.
    pub fn new(hosts: Vec<String>) -> Self {
        Self { hosts }
    }

    /// Returns `true` for http(s) URLs whose host matches an allowed
    /// hostname exactly or as a subdomain.
    pub fn permits(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        self.hosts
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{allowed}")))
    }
}
