//! Unified crate-level error types.
//!
//! A single [`RelayError`] covers the whole error taxonomy the proxy
//! surfaces to its caller:
//! - client errors (missing/invalid/disallowed source), and
//! - the catch-all upstream failure for anything the pipeline's inner
//!   guards could not absorb.
//!
//! Note: upstream variants intentionally remain string-based to avoid
//! pulling concrete HTTP client error types into the public API.

/// Result type used by this crate.
pub type RelayResult<T> = Result<T, RelayError>;

/// Unified error type for the `audio-relay` crate.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// No `src` query parameter was supplied.
    #[error("missing src parameter")]
    MissingSource,

    /// The `src` parameter did not parse as an absolute http(s) URL.
    #[error("invalid src URL")]
    InvalidUrl,

    /// The resolved target's host is not on the allow-list.
    #[error("host not allowed: {0}")]
    HostNotAllowed(String),

    /// An upstream fetch or stream read failed in a way the pipeline
    /// could not degrade around.
    #[error("proxy error: {0}")]
    Upstream(String),
}

impl RelayError {
    /// Convenience helper to construct an upstream failure.
    pub fn upstream(msg: impl Into<String>) -> Self {
        RelayError::Upstream(msg.into())
    }

    /// Whether this error is the caller's fault (maps to HTTP 400).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RelayError::MissingSource | RelayError::InvalidUrl | RelayError::HostNotAllowed(_)
        )
    }
}
