//! Common test utilities for store integration tests.
//!
//! All tests run against in-memory SQLite; no external services needed.

pub mod fixtures;
