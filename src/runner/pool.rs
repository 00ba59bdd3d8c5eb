//! Case scheduling: sequential, or a bounded pool of scoped worker threads
//!
//! Each case builds into its own output directory. Cases that would still write the same executable (the same
//! directory listed twice, or two explicit directories with the same base name) are grouped and run one after
//! another on a single worker; the only other shared state is the reporter, which sits behind a lock. Each worker buffers a case's events and replays them in one piece, so a case's
//! progress line and forwarded output are never interleaved with another case's.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam::channel;
use parking_lot::Mutex;

use super::discovery::DiscoveredCase;
use super::interfaces::{CaseReport, Reporter, RunError};
use super::orchestrator::Orchestrator;
use super::reporter::CaseBuffer;

/// Run cases one after another on the calling thread, in discovery order.
///
/// The case identifier is emitted before any tool runs, so a hanging tool is visible on the console.
pub fn run_sequential<R: Reporter>(
    cases: Vec<DiscoveredCase>,
    orchestrator: &Orchestrator,
    reporter: &mut R,
    fail_fast: bool,
) {
    for (index, discovered) in cases.into_iter().enumerate() {
        reporter.on_case_start(&discovered.name);
        let outcome = orchestrator.run_discovered(&discovered, &mut *reporter);
        let failed = !outcome.is_passed();
        reporter.record(CaseReport {
            index,
            name: discovered.name,
            outcome,
        });
        if fail_fast && failed {
            tracing::debug!("stopping after first failure");
            break;
        }
    }
}

/// Run cases on `workers` threads sharing one reporter.
pub fn run_pooled<R: Reporter + Send>(
    cases: Vec<DiscoveredCase>,
    orchestrator: &Orchestrator,
    reporter: &mut R,
    workers: usize,
    fail_fast: bool,
) -> Result<(), RunError> {
    let groups = group_by_executable(cases);
    let workers = workers.clamp(1, groups.len().max(1));
    let (tx, rx) = channel::unbounded::<Vec<(usize, DiscoveredCase)>>();
    for group in groups {
        // The receiver is alive until the scope below ends, so this cannot fail.
        let _ = tx.send(group);
    }
    drop(tx);

    let shared = Mutex::new(reporter);
    let stop = AtomicBool::new(false);
    tracing::debug!(workers, "starting worker pool");

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(|| {
                    while let Ok(group) = rx.recv() {
                        for (index, discovered) in group {
                            if stop.load(Ordering::SeqCst) {
                                return;
                            }
                            let mut buffer = CaseBuffer::new();
                            let outcome = orchestrator.run_discovered(&discovered, &mut buffer);
                            if fail_fast && !outcome.is_passed() {
                                stop.store(true, Ordering::SeqCst);
                            }
                            let report = CaseReport {
                                index,
                                name: discovered.name,
                                outcome,
                            };
                            let mut reporter = shared.lock();
                            buffer.replay(&mut **reporter, report);
                        }
                    }
                })
            })
            .collect();

        let panicked = handles.into_iter().map(|h| h.join()).filter(Result::is_err).count();
        if panicked > 0 {
            tracing::warn!(panicked, "worker threads panicked");
            return Err(RunError::WorkerPanicked);
        }
        Ok(())
    })
}

/// Split cases into scheduling units: cases that build the same executable share a unit, in discovery order.
///
/// Unresolved cases never touch the filesystem and always get a unit of their own.
fn group_by_executable(cases: Vec<DiscoveredCase>) -> Vec<Vec<(usize, DiscoveredCase)>> {
    let mut groups: Vec<Vec<(usize, DiscoveredCase)>> = Vec::new();
    let mut by_exe: HashMap<PathBuf, usize> = HashMap::new();
    for (index, discovered) in cases.into_iter().enumerate() {
        let slot = match discovered.case.as_ref().ok().map(|case| case.executable.clone()) {
            Some(exe) => *by_exe.entry(exe).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            }),
            None => {
                groups.push(Vec::new());
                groups.len() - 1
            }
        };
        groups[slot].push((index, discovered));
    }
    let shared = groups.iter().filter(|g| g.len() > 1).count();
    if shared > 0 {
        tracing::debug!(shared, "cases sharing an executable will run serially");
    }
    groups
}
