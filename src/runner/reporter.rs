//! Console reporting and run summary
//!
//! Output format, one line per case:
//!
//! ```text
//! 01-basic...passed
//! 04-double...FAILED found 2 spec files matching Test*.peg in 04-double
//! ```
//!
//! The identifier is flushed before the case runs so a hanging tool is visible. On failure the failing stage's
//! captured stdout and stderr are forwarded to the matching console stream before the verdict. Verbose runs end
//! with the totals and the wall-clock time:
//!
//! ```text
//! Ran 18 tests with 2 failures
//! finished in 4.127 secs
//! ```

use std::io::{self, Stderr, Stdout, Write};
use std::time::{Duration, Instant};

use super::interfaces::{CaseReport, Reporter, StageEvents};
use super::orchestrator::CaseOutcome;
use super::process::{CommandLine, StageResult};

/// Highest exit status a process can portably report.
pub const MAX_EXIT_STATUS: usize = 255;

// ============================================================================
// Run summary
// ============================================================================

/// Outcomes of every case in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    reports: Vec<CaseReport>,
}

impl RunSummary {
    /// Insert a report at its discovery position (reports may arrive out of order from the worker pool).
    pub fn push(&mut self, report: CaseReport) {
        let at = self.reports.partition_point(|r| r.index < report.index);
        self.reports.insert(at, report);
    }

    pub fn reports(&self) -> &[CaseReport] {
        &self.reports
    }

    pub fn total(&self) -> usize {
        self.reports.len()
    }

    pub fn failure_count(&self) -> usize {
        self.reports.iter().filter(|r| !r.outcome.is_passed()).count()
    }

    /// Process exit status: the failure count, saturated at [`MAX_EXIT_STATUS`] so it never wraps to zero.
    pub fn exit_status(&self) -> i32 {
        self.failure_count().min(MAX_EXIT_STATUS) as i32
    }
}

// ============================================================================
// Console reporter
// ============================================================================

/// Writes progress lines and forwarded tool output to two streams
pub struct ConsoleReporter<O: Write, E: Write> {
    out: O,
    err: E,
    verbose: bool,
    summary: RunSummary,
    started: Instant,
}

impl ConsoleReporter<Stdout, Stderr> {
    /// Reporter on the process's stdout and stderr.
    pub fn stdio(verbose: bool) -> Self {
        Self::new(io::stdout(), io::stderr(), verbose)
    }
}

impl<O: Write, E: Write> ConsoleReporter<O, E> {
    pub fn new(out: O, err: E, verbose: bool) -> Self {
        Self {
            out,
            err,
            verbose,
            summary: RunSummary::default(),
            started: Instant::now(),
        }
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Give back the output streams (used by tests to inspect what was written).
    pub fn into_streams(self) -> (O, E) {
        (self.out, self.err)
    }

    // Console write failures are not actionable mid-run; the exit status still reflects the outcomes.
    fn emit(&mut self, text: &str) {
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }

    fn forward_failure_output(&mut self, outcome: &CaseOutcome) {
        let Some(failure) = outcome.failure() else { return };
        // Verbose mode already forwarded stdout when the stage completed.
        if !self.verbose && !failure.stdout.is_empty() {
            let _ = self.out.write_all(failure.stdout.as_bytes());
        }
        if !failure.stderr.is_empty() {
            let _ = self.out.flush();
            let _ = self.err.write_all(failure.stderr.as_bytes());
            let _ = self.err.flush();
        }
    }
}

impl<O: Write, E: Write> StageEvents for ConsoleReporter<O, E> {
    fn on_command(&mut self, command: &CommandLine) {
        if self.verbose {
            self.emit(&format!("   {}\n", command));
        }
    }

    fn on_stage_complete(&mut self, result: &StageResult) {
        if self.verbose && !result.stdout.is_empty() {
            self.emit(&result.stdout);
        }
    }
}

impl<O: Write, E: Write> Reporter for ConsoleReporter<O, E> {
    fn on_case_start(&mut self, name: &str) {
        if self.verbose {
            self.emit(&format!("{}...\n", name));
        } else {
            self.emit(&format!("{}...", name));
        }
    }

    fn record(&mut self, report: CaseReport) {
        self.forward_failure_output(&report.outcome);
        self.emit(&format!("{}\n", report.outcome.verdict()));
        self.summary.push(report);
    }

    fn finalize(&mut self) -> i32 {
        if self.verbose {
            let totals = run_totals(&self.summary, self.started.elapsed());
            self.emit(&totals);
        }
        let _ = self.out.flush();
        let _ = self.err.flush();
        tracing::debug!(
            total = self.summary.total(),
            failed = self.summary.failure_count(),
            "run finished"
        );
        self.summary.exit_status()
    }
}

/// Closing lines of a verbose run; runs over a minute are timed in minutes.
fn run_totals(summary: &RunSummary, elapsed: Duration) -> String {
    let failures = match summary.failure_count() {
        0 => "no failures".to_string(),
        n => format!("{n} failures"),
    };
    let secs = elapsed.as_secs_f64();
    let time = if secs > 60.0 {
        format!("{:.3} mins", secs / 60.0)
    } else {
        format!("{secs:.3} secs")
    };
    format!("Ran {} tests with {}\nfinished in {}\n", summary.total(), failures, time)
}

// ============================================================================
// Buffered events (worker pool)
// ============================================================================

#[derive(Debug, Clone)]
enum Event {
    Command(CommandLine),
    StageComplete(StageResult),
}

/// Collects a case's events on a worker so they can be replayed into the shared reporter in one piece.
#[derive(Debug, Clone, Default)]
pub struct CaseBuffer {
    events: Vec<Event>,
}

impl CaseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay the case start, every buffered event, then the verdict.
    pub fn replay<R: Reporter + ?Sized>(self, reporter: &mut R, report: CaseReport) {
        reporter.on_case_start(&report.name);
        for event in self.events {
            match event {
                Event::Command(command) => reporter.on_command(&command),
                Event::StageComplete(result) => reporter.on_stage_complete(&result),
            }
        }
        reporter.record(report);
    }
}

impl StageEvents for CaseBuffer {
    fn on_command(&mut self, command: &CommandLine) {
        self.events.push(Event::Command(command.clone()));
    }

    fn on_stage_complete(&mut self, result: &StageResult) {
        self.events.push(Event::StageComplete(result.clone()));
    }
}
