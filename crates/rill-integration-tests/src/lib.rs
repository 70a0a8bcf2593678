//! # rill-integration-tests
//!
//! Cross-crate integration tests for the Rill workspace. The crate has no
//! library code; everything lives under `tests/`.
