//! HTTP surface for the `audio-relay` resolver.
//!
//! This crate is a thin axum shell: one proxy route, one health route.
//! All protocol logic lives in the `audio-relay` library; this file
//! only wires the router and re-exports it for integration tests.

pub mod app;

pub use crate::app::router;
