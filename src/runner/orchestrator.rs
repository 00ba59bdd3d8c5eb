//! Per-case orchestration
//!
//! Runs the stage list for one case, stopping at the first failure. The stage list is data, so the standard
//! generate/compile/execute pipeline and the fakes used in tests go through the same loop.

use std::sync::Arc;

use ftest_core::StageKind;

use super::discovery::{DiscoveredCase, TestCase};
use super::interfaces::{DiscoveryError, Stage, StageContext, StageEvents};
use super::process::StageResult;
use super::stages::{Toolchain, standard_stages};
use crate::config::RunConfig;

/// Where a failing case stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedAt {
    Discovery,
    Stage(StageKind),
}

/// Details of a failed case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseFailure {
    pub at: FailedAt,
    /// Verdict text (`build exe failed with error 1`)
    pub reason: String,
    /// Captured output of the failing stage, forwarded to the console
    pub stdout: String,
    pub stderr: String,
}

/// Result of running one case
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome {
    Passed,
    Failed(CaseFailure),
}

impl CaseOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, CaseOutcome::Passed)
    }

    pub fn failure(&self) -> Option<&CaseFailure> {
        match self {
            CaseOutcome::Passed => None,
            CaseOutcome::Failed(failure) => Some(failure),
        }
    }

    pub fn failed_at(&self) -> Option<FailedAt> {
        self.failure().map(|f| f.at)
    }

    /// The one-word or one-line verdict shown after the case identifier.
    pub fn verdict(&self) -> String {
        match self {
            CaseOutcome::Passed => "passed".to_string(),
            CaseOutcome::Failed(failure) => format!("FAILED {}", failure.reason),
        }
    }

    fn from_stage(result: StageResult) -> Self {
        CaseOutcome::Failed(CaseFailure {
            at: FailedAt::Stage(result.kind),
            reason: result.failure_reason(),
            stdout: result.stdout,
            stderr: result.stderr,
        })
    }
}

impl From<DiscoveryError> for CaseOutcome {
    fn from(err: DiscoveryError) -> Self {
        CaseOutcome::Failed(CaseFailure {
            at: FailedAt::Discovery,
            reason: err.to_string(),
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

/// Runs the stage list for each case
pub struct Orchestrator {
    stages: Vec<Box<dyn Stage>>,
}

impl Orchestrator {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// The standard generate/compile/execute pipeline for a run.
    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(standard_stages(Arc::new(Toolchain::from_config(config))))
    }

    pub fn stages(&self) -> impl Iterator<Item = StageKind> + '_ {
        self.stages.iter().map(|s| s.kind())
    }

    /// Run every stage in order; the first failing stage decides the outcome and nothing after it runs.
    #[tracing::instrument(skip_all, fields(case = %case.name))]
    pub fn run_case(&self, case: &TestCase, events: &mut dyn StageEvents) -> CaseOutcome {
        let mut ctx = StageContext::new(case, events);
        for stage in &self.stages {
            let result = stage.run(&mut ctx);
            ctx.events.on_stage_complete(&result);
            if !result.is_success() {
                tracing::debug!(stage = %result.kind, status = result.status, "stage failed");
                return CaseOutcome::from_stage(result);
            }
        }
        CaseOutcome::Passed
    }

    /// Run a discovered case, turning a discovery error into a failed outcome without invoking any tool.
    pub fn run_discovered(&self, discovered: &DiscoveredCase, events: &mut dyn StageEvents) -> CaseOutcome {
        match &discovered.case {
            Ok(case) => self.run_case(case, events),
            Err(err) => CaseOutcome::from(err.clone()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::runner::interfaces::NoEvents;
    use crate::runner::process::CommandLine;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Stage that returns a canned result and counts its invocations.
    struct Scripted {
        kind: StageKind,
        status: i32,
        stderr: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl Stage for Scripted {
        fn kind(&self) -> StageKind {
            self.kind
        }

        fn run(&self, ctx: &mut StageContext<'_>) -> StageResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ctx.events.on_command(&CommandLine::new(self.kind.name()));
            StageResult {
                kind: self.kind,
                status: self.status,
                stdout: format!("{} out", self.kind),
                stderr: self.stderr.to_string(),
                elapsed: None,
                timed_out: false,
            }
        }
    }

    fn pipeline(results: [(i32, &'static str); 3]) -> (Orchestrator, Vec<Arc<AtomicUsize>>) {
        let counters: Vec<Arc<AtomicUsize>> = (0..3).map(|_| Arc::new(AtomicUsize::new(0))).collect();
        let stages = ftest_core::STAGES
            .iter()
            .zip(results)
            .zip(&counters)
            .map(|((kind, (status, stderr)), calls)| {
                Box::new(Scripted {
                    kind: *kind,
                    status,
                    stderr,
                    calls: Arc::clone(calls),
                }) as Box<dyn Stage>
            })
            .collect();
        (Orchestrator::new(stages), counters)
    }

    fn case() -> TestCase {
        TestCase {
            name: "01-basic".to_string(),
            dir: PathBuf::from("01-basic"),
            spec: PathBuf::from("01-basic/TestBasic.peg"),
            generated: PathBuf::from("01-basic/TestBasic.cs"),
            executable: PathBuf::from("bin/TestBasic.exe"),
        }
    }

    fn calls(counters: &[Arc<AtomicUsize>]) -> Vec<usize> {
        counters.iter().map(|c| c.load(Ordering::SeqCst)).collect()
    }

    #[test]
    fn test_all_stages_pass() {
        let (orch, counters) = pipeline([(0, ""), (0, ""), (0, "")]);
        assert_eq!(orch.run_case(&case(), &mut NoEvents), CaseOutcome::Passed);
        assert_eq!(calls(&counters), vec![1, 1, 1]);
    }

    #[test]
    fn test_generate_failure_skips_compile_and_execute() {
        let (orch, counters) = pipeline([(1, "syntax error"), (0, ""), (0, "")]);
        let outcome = orch.run_case(&case(), &mut NoEvents);
        assert_eq!(outcome.failed_at(), Some(FailedAt::Stage(StageKind::Generate)));
        assert_eq!(outcome.verdict(), "FAILED build parser failed with error 1");
        assert_eq!(calls(&counters), vec![1, 0, 0]);
    }

    #[test]
    fn test_stderr_with_zero_status_fails_the_stage() {
        let (orch, counters) = pipeline([(0, ""), (0, "warning CS0168"), (0, "")]);
        let outcome = orch.run_case(&case(), &mut NoEvents);
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.at, FailedAt::Stage(StageKind::Compile));
        assert_eq!(failure.reason, "build exe failed with error 0");
        assert_eq!(failure.stderr, "warning CS0168");
        assert_eq!(failure.stdout, "compile out");
        assert_eq!(calls(&counters), vec![1, 1, 0]);
    }

    #[test]
    fn test_execute_failure() {
        let (orch, _) = pipeline([(0, ""), (0, ""), (3, "")]);
        let outcome = orch.run_case(&case(), &mut NoEvents);
        assert_eq!(outcome.verdict(), "FAILED run app failed with error 3");
    }

    #[test]
    fn test_discovery_error_runs_nothing() {
        let (orch, counters) = pipeline([(0, ""), (0, ""), (0, "")]);
        let discovered = DiscoveredCase {
            name: "04-double".to_string(),
            dir: PathBuf::from("04-double"),
            case: Err(DiscoveryError::SpecCount {
                dir: PathBuf::from("04-double"),
                pattern: "Test*.peg".to_string(),
                count: 2,
            }),
        };
        let outcome = orch.run_discovered(&discovered, &mut NoEvents);
        assert_eq!(outcome.failed_at(), Some(FailedAt::Discovery));
        assert_eq!(
            outcome.verdict(),
            "FAILED found 2 spec files matching Test*.peg in 04-double"
        );
        assert_eq!(calls(&counters), vec![0, 0, 0]);
    }

    #[test]
    fn test_events_see_each_command_then_its_result() {
        #[derive(Default)]
        struct Log(Vec<String>);
        impl StageEvents for Log {
            fn on_command(&mut self, command: &CommandLine) {
                self.0.push(format!("cmd {}", command));
            }
            fn on_stage_complete(&mut self, result: &StageResult) {
                self.0.push(format!("done {} {}", result.kind, result.status));
            }
        }

        let (orch, _) = pipeline([(0, ""), (2, ""), (0, "")]);
        let mut log = Log::default();
        orch.run_case(&case(), &mut log);
        assert_eq!(
            log.0,
            vec!["cmd generate", "done generate 0", "cmd compile", "done compile 2"]
        );
    }

    #[test]
    fn test_standard_pipeline_order() {
        let orch = Orchestrator::from_config(&RunConfig::default());
        assert_eq!(orch.stages().collect::<Vec<_>>(), ftest_core::STAGES.to_vec());
    }
}
