//! Runner I/O boundary interfaces
//!
//! This module defines the seams of the pipeline:
//! - Stages (one external tool invocation per test case)
//! - Stage events (command echo and captured output, observed while a case runs)
//! - Reporting (per-case verdicts and the final exit status)
//!
//! Plus the two error families: case-level discovery errors, which become failed outcomes, and run-level errors,
//! which abort the run.

use std::path::{Path, PathBuf};

use ftest_core::StageKind;
use miette::Diagnostic;
use thiserror::Error;

use super::discovery::TestCase;
use super::orchestrator::CaseOutcome;
use super::process::{CommandLine, StageResult};

// ============================================================================
// Errors
// ============================================================================

/// A directory that looked like a test case but cannot be run as one.
///
/// These never abort the run; the case is reported as failed and the run moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("found {count} spec files matching {pattern} in {}", .dir.display())]
    SpecCount {
        dir: PathBuf,
        pattern: String,
        count: usize,
    },

    #[error("test directory {} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("cannot read test directory {}: {message}", .dir.display())]
    Unreadable { dir: PathBuf, message: String },
}

/// Failures that stop the whole run before (or while) cases execute.
#[derive(Debug, Error, Diagnostic)]
pub enum RunError {
    #[error("test root `{}` does not exist", .0.display())]
    #[diagnostic(
        code(ftest::root_missing),
        help("run from the directory holding the numbered test cases, or pass --root")
    )]
    RootMissing(PathBuf),

    #[error("cannot read test root `{}`", .path.display())]
    #[diagnostic(code(ftest::root_unreadable))]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("a worker thread panicked while running test cases")]
    #[diagnostic(code(ftest::worker_panicked))]
    WorkerPanicked,
}

// ============================================================================
// Stage Interface
// ============================================================================

/// Observer for what happens inside a case while it runs.
pub trait StageEvents {
    /// A command is about to be run.
    fn on_command(&mut self, command: &CommandLine);

    /// A stage finished (successfully or not).
    fn on_stage_complete(&mut self, result: &StageResult);
}

/// Events sink that drops everything.
pub struct NoEvents;

impl StageEvents for NoEvents {
    fn on_command(&mut self, _command: &CommandLine) {}
    fn on_stage_complete(&mut self, _result: &StageResult) {}
}

/// Per-case state threaded through the stages.
pub struct StageContext<'a> {
    pub case: &'a TestCase,
    /// Executable produced by the compile stage, once it ran
    pub executable: Option<PathBuf>,
    pub events: &'a mut dyn StageEvents,
}

impl<'a> StageContext<'a> {
    pub fn new(case: &'a TestCase, events: &'a mut dyn StageEvents) -> Self {
        Self {
            case,
            executable: None,
            events,
        }
    }

    /// The executable to run: whatever compile produced, else the case's derived path.
    pub fn executable(&self) -> &Path {
        self.executable.as_deref().unwrap_or(&self.case.executable)
    }
}

/// One step of the per-case pipeline.
///
/// Stages run in a fixed order and the first failing one ends the case; later stages never see it.
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    fn run(&self, ctx: &mut StageContext<'_>) -> StageResult;
}

// ============================================================================
// Reporter Interface
// ============================================================================

/// A finished case, tagged with its position in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReport {
    pub index: usize,
    pub name: String,
    pub outcome: CaseOutcome,
}

/// Receives per-case progress and verdicts, and produces the run's exit status.
pub trait Reporter: StageEvents {
    /// A case is starting (prints the case identifier).
    fn on_case_start(&mut self, name: &str);

    /// Record a case's outcome (prints its verdict).
    fn record(&mut self, report: CaseReport);

    /// Close the run and return the process exit status.
    fn finalize(&mut self) -> i32;
}
