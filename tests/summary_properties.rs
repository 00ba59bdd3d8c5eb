//! Property tests for the run summary: ordering and exit status.

use ftest::runner::interfaces::CaseReport;
use ftest::runner::orchestrator::{CaseFailure, FailedAt};
use ftest::runner::reporter::MAX_EXIT_STATUS;
use ftest::{CaseOutcome, RunSummary};
use ftest_core::StageKind;
use proptest::prelude::*;

fn outcome(failed: bool) -> CaseOutcome {
    if failed {
        CaseOutcome::Failed(CaseFailure {
            at: FailedAt::Stage(StageKind::Execute),
            reason: "run app failed with error 1".to_string(),
            stdout: String::new(),
            stderr: String::new(),
        })
    } else {
        CaseOutcome::Passed
    }
}

proptest! {
    #[test]
    fn exit_status_is_the_failure_count_saturated(failures in 0usize..600, passes in 0usize..50) {
        let mut summary = RunSummary::default();
        for index in 0..failures + passes {
            summary.push(CaseReport { index, name: format!("{index:03}"), outcome: outcome(index < failures) });
        }
        prop_assert_eq!(summary.failure_count(), failures);
        prop_assert_eq!(summary.exit_status() as usize, failures.min(MAX_EXIT_STATUS));
        prop_assert_eq!(summary.exit_status() == 0, failures == 0);
    }

    #[test]
    fn reports_come_back_in_discovery_order(order in Just((0..20usize).collect::<Vec<_>>()).prop_shuffle()) {
        let mut summary = RunSummary::default();
        for &index in &order {
            summary.push(CaseReport { index, name: index.to_string(), outcome: outcome(index % 3 == 0) });
        }
        let indices: Vec<usize> = summary.reports().iter().map(|r| r.index).collect();
        prop_assert_eq!(indices, (0..20).collect::<Vec<_>>());
    }
}
