//! Remote audio resolver.
//!
//! Given an untrusted source URL, produce a byte stream suitable for
//! playback in a browser `<audio>` element: normalize cloud-storage
//! share links into their direct-download form, follow the provider's
//! large-file confirmation interstitial when one appears, and support
//! HTTP range requests for seeking. The resolver is stateless across
//! calls; the only security boundary is a hostname allow-list that
//! keeps the proxy from being used as an open relay.
//!
//! The HTTP surface lives in the companion `audio-relay-server` crate;
//! this crate only implements the pipeline.

pub mod allowlist;
pub mod drive;
pub mod error;
pub mod headers;
pub mod resolver;
pub mod settings;

pub use crate::error::{RelayError, RelayResult};
pub use crate::resolver::{RelayByteStream, ResolvedMedia, Resolver};
pub use crate::settings::RelaySettings;
