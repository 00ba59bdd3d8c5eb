//! Provide the shared, pure vocabulary of the ftest functional-test driver.
//!
//! This crate is intentionally small and dependency-free. It contains deterministic helpers that both:
//! - the runner can use to classify test-case directories and derive artifact paths, and
//! - the CLI can use to describe stages and platforms consistently in its output.
//!
//! ## Notes
//!
//! - This is a “vocabulary” crate: **no IO**, no global state, and no process or filesystem types beyond `Path`.
//! - Current scope: stage kinds and their labels, the test-case naming conventions, and the per-platform
//!   command-line strategy table.

pub mod naming;
pub mod platform;

/// Identify one of the three external-process stages a test case goes through.
///
/// Stages always run in declaration order: [`StageKind::Generate`], then [`StageKind::Compile`], then
/// [`StageKind::Execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageKind {
    /// Turn the specification file into source code with the artifact generator.
    Generate,
    /// Compile the generated source plus hand-written sources into an executable.
    Compile,
    /// Run the built executable.
    Execute,
}

/// All stages, in pipeline order.
pub const STAGES: [StageKind; 3] = [StageKind::Generate, StageKind::Compile, StageKind::Execute];

impl StageKind {
    /// Short machine-friendly name (`generate`, `compile`, `execute`).
    pub const fn name(self) -> &'static str {
        match self {
            StageKind::Generate => "generate",
            StageKind::Compile => "compile",
            StageKind::Execute => "execute",
        }
    }

    /// Human label used in failure verdicts.
    ///
    /// ## Notes
    /// - CI log scrapers key on this wording (`build parser failed with error 1`); keep it stable.
    pub const fn label(self) -> &'static str {
        match self {
            StageKind::Generate => "build parser",
            StageKind::Compile => "build exe",
            StageKind::Execute => "run app",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
