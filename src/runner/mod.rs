//! The functional-test pipeline
//!
//! Discovery → (Generate → Compile → Execute per case) → Reporter. The run's exit status is the number of failed
//! cases.
//!
//! ## Panic Policy
//!
//! Nothing in this module panics on bad input or failing tools; everything is folded into case outcomes, and only
//! a missing or unreadable test root surfaces as a [`RunError`].

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod discovery;
pub mod interfaces;
pub mod orchestrator;
pub mod pool;
pub mod process;
pub mod reporter;
pub mod stages;
pub mod toolchain;

pub use discovery::{DiscoveredCase, Discovery, TestCase};
pub use interfaces::{CaseReport, DiscoveryError, Reporter, RunError, Stage, StageContext, StageEvents};
pub use orchestrator::{CaseFailure, CaseOutcome, FailedAt, Orchestrator};
pub use process::{CommandLine, ProcessRunner, StageResult};
pub use reporter::{ConsoleReporter, RunSummary};
pub use stages::Toolchain;
pub use toolchain::{CommandBuilder, PlatformCommandBuilder};

use crate::config::RunConfig;

/// Discover and run every case, feeding progress and verdicts to `reporter`.
///
/// Returns the reporter's exit status. A [`RunError`] means the run itself could not proceed (root missing, or a
/// worker died); case failures never surface here.
pub fn run_suite<R: Reporter + Send>(
    config: &RunConfig,
    orchestrator: &Orchestrator,
    reporter: &mut R,
) -> Result<i32, RunError> {
    let cases = Discovery::from_config(config).discover()?;
    let jobs = config.effective_jobs();
    tracing::debug!(
        cases = cases.len(),
        jobs,
        stages = ?orchestrator.stages().collect::<Vec<_>>(),
        "running suite"
    );

    if jobs <= 1 {
        pool::run_sequential(cases, orchestrator, reporter, config.fail_fast);
    } else {
        pool::run_pooled(cases, orchestrator, reporter, jobs, config.fail_fast)?;
    }
    Ok(reporter.finalize())
}
