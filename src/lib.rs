#![forbid(unsafe_code)]
//! ftest: functional-test driver for a parser generator toolchain
//!
//! Each numbered directory under the test root is one case: a single specification file plus hand-written
//! sources. For every case the driver runs the generator, compiles the generated and hand-written sources in
//! strict mode, and runs the resulting executable. The process exits with the number of failed cases.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` and `runner` modules
//!   enforce `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **External tools**: A tool that cannot be started, crashes, hangs past its timeout or writes to stderr is a
//!   failed case, never a panic or an early exit.

pub mod cli;
pub mod config;
pub mod runner;
pub mod version;

pub use config::RunConfig;
pub use runner::{
    CaseOutcome, CommandBuilder, ConsoleReporter, Discovery, Orchestrator, ProcessRunner, RunError, RunSummary,
    StageResult, TestCase, run_suite,
};
