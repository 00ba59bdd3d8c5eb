//! ftest version information.
//!
//! Exposed as a single constant so the CLI and log lines agree on the same value.

/// The ftest version string (for example, `0.2.0`).
pub const FTEST_VERSION: &str = env!("CARGO_PKG_VERSION");
