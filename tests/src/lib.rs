//! Integration-test package for the audio-relay workspace.
//!
//! All tests live under `tests/`; this library target is intentionally
//! empty.
