//! Process runner: spawn one external command, capture its output, classify the result
//!
//! The runner never fails. Anything that goes wrong while starting or waiting for the child is folded into the
//! returned [`StageResult`] as a sentinel status plus an explanation on stderr, so callers only ever inspect one
//! shape.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use ftest_core::StageKind;

/// Status reported when the command could not be started (or waited for).
pub const LAUNCH_FAILURE_STATUS: i32 = 127;

/// Status reported when the command was killed after exceeding the stage timeout.
pub const TIMEOUT_STATUS: i32 = 124;

/// Status reported when the platform gives neither an exit code nor a signal.
pub const UNKNOWN_STATUS: i32 = -1;

/// How often a child is polled while a timeout is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long to wait for output pipes to close after killing a child.
///
/// Grandchildren that inherited the pipes can keep them open indefinitely, so draining is bounded too.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

// ============================================================================
// Command lines
// ============================================================================

/// A fully formed command line: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl CommandLine {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Prefix this command with a launcher (`mono --debug app.exe`).
    ///
    /// An empty prefix returns the command unchanged.
    pub fn wrapped(self, launcher: &[&str]) -> Self {
        let Some((program, launcher_args)) = launcher.split_first() else {
            return self;
        };
        CommandLine::new(program)
            .args(launcher_args)
            .arg(self.program)
            .args(self.args)
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_word(f, &self.program)?;
        for arg in &self.args {
            f.write_str(" ")?;
            write_word(f, arg)?;
        }
        Ok(())
    }
}

fn write_word(f: &mut fmt::Formatter<'_>, word: &OsStr) -> fmt::Result {
    let text = word.to_string_lossy();
    if text.is_empty() || text.contains(char::is_whitespace) {
        write!(f, "\"{}\"", text)
    } else {
        f.write_str(&text)
    }
}

// ============================================================================
// Stage results
// ============================================================================

/// Outcome of one external-process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    pub kind: StageKind,
    /// Exit status, or one of the sentinel statuses
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Option<Duration>,
    pub timed_out: bool,
}

impl StageResult {
    /// A stage succeeds only with exit status zero and nothing at all on stderr.
    ///
    /// Any stderr output fails the stage even when the exit status is zero: compiler warnings and runtime
    /// diagnostics count as failures.
    pub fn is_success(&self) -> bool {
        self.status == 0 && self.stderr.is_empty()
    }

    /// One-line failure reason for the verdict (`build exe failed with error 1`).
    pub fn failure_reason(&self) -> String {
        if self.timed_out {
            let secs = self.elapsed.map(|d| d.as_secs_f64()).unwrap_or_default();
            format!("{} timed out after {:.1}s", self.kind.label(), secs)
        } else {
            format!("{} failed with error {}", self.kind.label(), self.status)
        }
    }

    fn launch_failure(kind: StageKind, command: &CommandLine, err: &std::io::Error, elapsed: Duration) -> Self {
        Self {
            kind,
            status: LAUNCH_FAILURE_STATUS,
            stdout: String::new(),
            stderr: format!("failed to launch `{}`: {}\n", command.program.to_string_lossy(), err),
            elapsed: Some(elapsed),
            timed_out: false,
        }
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Spawns commands and waits for them, optionally with a timeout
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

enum Waited {
    Exited(ExitStatus),
    TimedOut,
    Failed(std::io::Error),
}

impl ProcessRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Run `command` to completion and capture both output streams in memory.
    pub fn run(&self, kind: StageKind, command: &CommandLine, working_dir: Option<&Path>) -> StageResult {
        let start = Instant::now();
        tracing::debug!(stage = %kind, command = %command, "spawning");

        let mut cmd = command.to_command();
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                tracing::debug!(stage = %kind, error = %err, "launch failed");
                return StageResult::launch_failure(kind, command, &err, start.elapsed());
            }
        };

        let stdout_rx = child.stdout.take().map(drain);
        let stderr_rx = child.stderr.take().map(drain);

        // The timeout bounds the whole stage: waiting for the child and then for its pipes to close.
        let deadline = self.timeout.map(|timeout| start + timeout);
        let waited = self.wait(&mut child, deadline);
        let drain_until = match waited {
            Waited::TimedOut => Some(Instant::now() + DRAIN_GRACE),
            _ => deadline,
        };
        let stdout = collect(stdout_rx, drain_until);
        let stderr = collect(stderr_rx, drain_until);
        let pipes_held = stdout.is_none() || stderr.is_none();
        let stdout = stdout.unwrap_or_default();
        let mut stderr = stderr.unwrap_or_default();
        let elapsed = start.elapsed();

        let (status, timed_out) = match waited {
            Waited::Exited(_) if pipes_held => {
                tracing::debug!(stage = %kind, "output pipes still open at the deadline");
                stderr.push_str(&self.timeout_note());
                (TIMEOUT_STATUS, true)
            }
            Waited::Exited(status) => (exit_code(status), false),
            Waited::TimedOut => {
                stderr.push_str(&self.timeout_note());
                (TIMEOUT_STATUS, true)
            }
            Waited::Failed(err) => {
                stderr.push_str(&format!(
                    "failed waiting for `{}`: {}\n",
                    command.program.to_string_lossy(),
                    err
                ));
                (LAUNCH_FAILURE_STATUS, false)
            }
        };

        tracing::debug!(stage = %kind, status, timed_out, elapsed_ms = elapsed.as_millis() as u64, "finished");

        StageResult {
            kind,
            status,
            stdout,
            stderr,
            elapsed: Some(elapsed),
            timed_out,
        }
    }

    fn timeout_note(&self) -> String {
        let secs = self.timeout.map(|d| d.as_secs_f64()).unwrap_or_default();
        format!("killed after exceeding the {secs:.1}s stage timeout\n")
    }

    fn wait(&self, child: &mut Child, deadline: Option<Instant>) -> Waited {
        let Some(deadline) = deadline else {
            return match child.wait() {
                Ok(status) => Waited::Exited(status),
                Err(err) => Waited::Failed(err),
            };
        };

        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Waited::Exited(status),
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Waited::TimedOut;
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(err) => return Waited::Failed(err),
            }
        }
    }
}

/// Read a pipe to the end on a helper thread so a chatty child never blocks on a full pipe.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = channel::bounded(1);
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}

/// Wait for a drained pipe, up to `until`.
///
/// Returns `None` if the pipe was still open when `until` passed.
fn collect(rx: Option<Receiver<Vec<u8>>>, until: Option<Instant>) -> Option<String> {
    let Some(rx) = rx else {
        return Some(String::new());
    };
    let bytes = match until {
        Some(until) => match rx.recv_timeout(until.saturating_duration_since(Instant::now())) {
            Ok(bytes) => bytes,
            Err(RecvTimeoutError::Timeout) => return None,
            Err(RecvTimeoutError::Disconnected) => Vec::new(),
        },
        None => rx.recv().unwrap_or_default(),
    };
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    UNKNOWN_STATUS
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn result(status: i32, stderr: &str) -> StageResult {
        StageResult {
            kind: StageKind::Compile,
            status,
            stdout: String::new(),
            stderr: stderr.to_string(),
            elapsed: None,
            timed_out: false,
        }
    }

    // ========================================
    // Success classification
    // ========================================

    #[test]
    fn test_zero_status_and_empty_stderr_succeeds() {
        assert!(result(0, "").is_success());
    }

    #[test]
    fn test_stderr_fails_even_with_zero_status() {
        assert!(!result(0, "warning CS0168: unused variable\n").is_success());
    }

    #[test]
    fn test_nonzero_status_fails() {
        assert!(!result(2, "").is_success());
    }

    #[test]
    fn test_failure_reason_wording() {
        assert_eq!(result(1, "").failure_reason(), "build exe failed with error 1");

        let mut hung = result(TIMEOUT_STATUS, "");
        hung.kind = StageKind::Execute;
        hung.timed_out = true;
        hung.elapsed = Some(Duration::from_secs(5));
        assert_eq!(hung.failure_reason(), "run app timed out after 5.0s");
    }

    // ========================================
    // Command lines
    // ========================================

    #[test]
    fn test_display_quotes_words_with_spaces() {
        let cmd = CommandLine::new("gmcs")
            .arg("-out:../bin/ftest/Test1.exe")
            .arg("My Sources/A.cs")
            .arg("");
        insta::assert_snapshot!(cmd.to_string(), @r#"gmcs -out:../bin/ftest/Test1.exe "My Sources/A.cs" """#);
    }

    #[test]
    fn test_wrapped_prepends_launcher() {
        let cmd = CommandLine::new("../bin/peg-sharp.exe").arg("--out=Test1.cs").arg("Test1.peg");
        let wrapped = cmd.wrapped(&["mono", "--debug"]);
        insta::assert_snapshot!(wrapped.to_string(), @"mono --debug ../bin/peg-sharp.exe --out=Test1.cs Test1.peg");
    }

    #[test]
    fn test_wrapped_with_empty_launcher_is_identity() {
        let cmd = CommandLine::new("app.exe").arg("x");
        assert_eq!(cmd.clone().wrapped(&[]), cmd);
    }

    // ========================================
    // Spawning (needs a POSIX shell)
    // ========================================

    #[cfg(unix)]
    fn sh(script: &str) -> CommandLine {
        CommandLine::new("sh").arg("-c").arg(script)
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_both_streams() {
        let runner = ProcessRunner::default();
        let res = runner.run(StageKind::Execute, &sh("echo out; echo err >&2; exit 3"), None);
        assert_eq!(res.status, 3);
        assert_eq!(res.stdout, "out\n");
        assert_eq!(res.stderr, "err\n");
        assert!(!res.timed_out);
        assert!(res.elapsed.is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_clean_exit_is_success() {
        let res = ProcessRunner::default().run(StageKind::Execute, &sh("echo fine"), None);
        assert!(res.is_success(), "{res:?}");
    }

    #[cfg(unix)]
    #[test]
    fn test_large_output_does_not_deadlock() {
        let script = "i=0; while [ $i -lt 20000 ]; do echo line-$i; echo e-$i >&2; i=$((i+1)); done";
        let res = ProcessRunner::default().run(StageKind::Execute, &sh(script), None);
        assert_eq!(res.status, 0);
        assert_eq!(res.stdout.lines().count(), 20000);
        assert_eq!(res.stderr.lines().count(), 20000);
    }

    #[cfg(unix)]
    #[test]
    fn test_working_directory_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let res = ProcessRunner::default().run(StageKind::Execute, &sh("pwd"), Some(dir.path()));
        let reported = std::fs::canonicalize(res.stdout.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_and_reports() {
        let runner = ProcessRunner::new(Some(Duration::from_millis(200)));
        let res = runner.run(StageKind::Execute, &sh("exec sleep 30"), None);
        assert!(res.timed_out);
        assert_eq!(res.status, TIMEOUT_STATUS);
        assert!(!res.is_success());
        assert!(res.stderr.contains("stage timeout"));
        assert!(res.elapsed.unwrap() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_covers_pipes_held_by_a_grandchild() {
        let runner = ProcessRunner::new(Some(Duration::from_millis(300)));
        let res = runner.run(StageKind::Execute, &sh("sleep 6 & echo started; exit 0"), None);
        assert!(res.timed_out, "{res:?}");
        assert_eq!(res.status, TIMEOUT_STATUS);
        assert!(res.stderr.contains("stage timeout"));
        assert!(res.elapsed.unwrap() < Duration::from_secs(3), "{res:?}");
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_leaves_fast_commands_alone() {
        let runner = ProcessRunner::new(Some(Duration::from_secs(5)));
        let res = runner.run(StageKind::Execute, &sh("echo quick"), None);
        assert!(res.is_success(), "{res:?}");
        assert_eq!(res.stdout, "quick\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_maps_above_128() {
        let res = ProcessRunner::default().run(StageKind::Execute, &sh("kill -9 $$"), None);
        assert_eq!(res.status, 128 + 9);
    }

    #[test]
    fn test_missing_program_is_launch_failure() {
        let cmd = CommandLine::new("definitely-not-a-real-tool-ftest").arg("x");
        let res = ProcessRunner::default().run(StageKind::Generate, &cmd, None);
        assert_eq!(res.status, LAUNCH_FAILURE_STATUS);
        assert!(res.stderr.contains("failed to launch `definitely-not-a-real-tool-ftest`"));
        assert!(!res.is_success());
    }
}
