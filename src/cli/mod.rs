//! CLI module for the ftest driver
//!
//! This module provides the command-line interface.
//!
//! ## Usage
//!
//! - `ftest` - Discover and run every numbered test case under the current directory
//! - `ftest 01-basic 12.uri` - Run exactly these case directories, in this order
//! - `ftest --list` - Show what would run without invoking any tool
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits. The exit status of a run is the number of failed
//! cases.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use ftest_core::naming::Conventions;

use crate::config::{DEFAULT_BIN_DIR, EXPLICIT_CASE_GENERATOR_FLAGS, RunConfig, split_flags};
use crate::version::FTEST_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Render a diagnostic with miette and fail with exit code 1.
    pub fn diagnostic(err: impl miette::Diagnostic + Send + Sync + 'static) -> Self {
        Self::failure(format!("{:?}", miette::Report::new(err)))
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Generate, compile and run numbered functional-test cases
#[derive(Parser, Debug)]
#[command(name = "ftest")]
#[command(version = FTEST_VERSION)]
#[command(about = "Generate, compile and run numbered functional-test cases", long_about = None)]
pub struct Cli {
    /// Test-case directories to run (default: every digit-prefixed directory under the root)
    #[arg(value_name = "TEST_DIRS")]
    pub cases: Vec<PathBuf>,

    /// Echo each command and forward tool output (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Number of cases to run in parallel (0 = one per CPU)
    #[arg(short, long, value_name = "N", default_value_t = 1)]
    pub jobs: usize,

    /// Kill any stage that runs longer than this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Stop after the first failing case
    #[arg(short = 'x', long = "exitfirst")]
    pub exit_first: bool,

    /// Directory holding the test cases
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Directory holding the generator and receiving built executables (relative to the root)
    #[arg(long, value_name = "DIR", default_value = DEFAULT_BIN_DIR)]
    pub bin_dir: PathBuf,

    /// Generator executable (default: derived from the bin directory)
    #[arg(long, value_name = "PATH")]
    pub generator: Option<PathBuf>,

    /// Compiler program (default: csc on Windows, gmcs elsewhere)
    #[arg(long, value_name = "PROG")]
    pub compiler: Option<String>,

    /// Extra compiler flags, split on whitespace
    #[arg(long, value_name = "FLAGS", env = "CSC_FLAGS", allow_hyphen_values = true)]
    pub compiler_flags: Option<String>,

    /// Extension of specification files
    #[arg(long, value_name = "EXT")]
    pub spec_ext: Option<String>,

    /// Extension of hand-written sources compiled with each case
    #[arg(long, value_name = "EXT")]
    pub source_ext: Option<String>,

    /// Extension the generator writes
    #[arg(long, value_name = "EXT")]
    pub generated_ext: Option<String>,

    /// List the discovered cases without running them
    #[arg(long)]
    pub list: bool,
}

impl Cli {
    /// Build the run configuration these arguments describe.
    pub fn to_config(&self) -> RunConfig {
        let mut conventions = Conventions::default();
        if let Some(ext) = &self.spec_ext {
            conventions = conventions.with_spec_ext(ext.as_str());
        }
        if let Some(ext) = &self.source_ext {
            conventions = conventions.with_source_ext(ext.as_str());
        }
        if let Some(ext) = &self.generated_ext {
            conventions = conventions.with_generated_ext(ext.as_str());
        }

        let mut config = RunConfig::new()
            .with_verbose(self.verbose)
            .with_root(&self.root)
            .with_cases(self.cases.iter().cloned())
            .with_conventions(conventions)
            .with_bin_dir(&self.bin_dir)
            .with_jobs(self.jobs)
            .with_fail_fast(self.exit_first);

        if let Some(generator) = &self.generator {
            config = config.with_generator(generator);
        }
        if let Some(compiler) = &self.compiler {
            config = config.with_compiler(compiler.as_str());
        }
        if let Some(flags) = &self.compiler_flags {
            config = config.with_compiler_flags(split_flags(flags));
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        // Explicitly named cases get the generator's most verbose diagnostics.
        if !self.cases.is_empty() {
            config = config.with_generator_flags(EXPLICIT_CASE_GENERATOR_FLAGS.iter().copied());
        }
        config
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
pub fn execute(cli: Cli) -> CliResult<ExitCode> {
    let config = cli.to_config();
    tracing::debug!(version = FTEST_VERSION, root = %config.root.display(), "ftest starting");
    if cli.list {
        commands::list_cases(&config)
    } else {
        commands::run_tests(&config)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_defaults() {
        let cli = Cli::try_parse_from(["ftest"]).unwrap();
        assert!(cli.cases.is_empty());
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.jobs, 1);
        assert!(!cli.list);

        let config = cli.to_config();
        assert_eq!(config.root, PathBuf::from("."));
        assert_eq!(config.bin_dir, PathBuf::from(DEFAULT_BIN_DIR));
        assert!(config.generator_flags.is_empty());
    }

    #[test]
    fn test_cli_parse_verbose_count() {
        let cli = Cli::try_parse_from(["ftest", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        let cli = Cli::try_parse_from(["ftest", "-v", "--verbose"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_explicit_cases_add_generator_verbosity() {
        let cli = Cli::try_parse_from(["ftest", "12.uri", "01-basic"]).unwrap();
        let config = cli.to_config();
        assert_eq!(config.cases, vec![PathBuf::from("12.uri"), PathBuf::from("01-basic")]);
        assert_eq!(config.generator_flags, vec!["-vvv"]);
    }

    #[test]
    fn test_cli_parse_pool_and_timeout() {
        let cli = Cli::try_parse_from(["ftest", "-j", "4", "--timeout", "30", "-x"]).unwrap();
        let config = cli.to_config();
        assert_eq!(config.jobs, 4);
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert!(config.fail_fast);
    }

    #[test]
    fn test_cli_parse_compiler_flags_with_hyphens() {
        let cli = Cli::try_parse_from(["ftest", "--compiler-flags", "-d:FOO -optimize+"]).unwrap();
        let config = cli.to_config();
        assert_eq!(config.compiler_flags, vec!["-d:FOO", "-optimize+"]);
    }

    #[test]
    fn test_cli_parse_conventions() {
        let cli = Cli::try_parse_from([
            "ftest",
            "--spec-ext",
            "spec",
            "--source-ext",
            "src",
            "--generated-ext",
            "gen",
        ])
        .unwrap();
        let conventions = cli.to_config().conventions;
        assert_eq!(conventions.spec_pattern(), "Test*.spec");
        assert_eq!(conventions.source_ext, "src");
        assert_eq!(conventions.generated_ext, "gen");
    }

    #[test]
    fn test_cli_parse_tool_overrides() {
        let cli = Cli::try_parse_from([
            "ftest",
            "--root",
            "suite",
            "--generator",
            "/opt/gen",
            "--compiler",
            "mcs",
        ])
        .unwrap();
        let config = cli.to_config();
        assert_eq!(config.generator_path(), PathBuf::from("/opt/gen"));
        assert_eq!(config.compiler_program(), "mcs");
        assert_eq!(config.root, PathBuf::from("suite"));
    }

    #[test]
    fn test_cli_error_diagnostic_mentions_root() {
        let err = CliError::diagnostic(crate::runner::RunError::RootMissing(PathBuf::from("nowhere")));
        assert_eq!(err.exit_code, ExitCode::FAILURE);
        assert!(err.message.contains("nowhere"));
    }
}
