//! Run configuration for the ftest driver
//!
//! One `RunConfig` is built at startup (by the CLI or by a test) and threaded into discovery, the orchestrator
//! and the reporter. Nothing in the pipeline reads global state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ftest_core::naming::Conventions;
use ftest_core::platform::Platform;

/// Default location of the tool binaries, relative to the test root.
pub const DEFAULT_BIN_DIR: &str = "../bin";

/// Extra generator flags used when test directories are named explicitly on the command line.
pub const EXPLICIT_CASE_GENERATOR_FLAGS: &[&str] = &["-vvv"];

/// Verbosity threshold at which commands are echoed and captured stdout is forwarded.
pub const VERBOSE_ECHO_LEVEL: u8 = 1;

/// Configuration for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Verbosity level (0 = progress only)
    pub verbose: u8,
    /// Directory test cases are discovered in and run from
    pub root: PathBuf,
    /// Explicit test-case directories; empty means discover under `root`
    pub cases: Vec<PathBuf>,
    /// File-naming rules
    pub conventions: Conventions,
    /// Platform whose command-line profile is used
    pub platform: Platform,
    /// Directory holding the generator and receiving built executables
    pub bin_dir: PathBuf,
    /// Generator override (default is derived from `bin_dir` and the platform profile)
    pub generator: Option<PathBuf>,
    /// Compiler override (default comes from the platform profile)
    pub compiler: Option<String>,
    /// Extra compiler flags, appended after the strict-mode flags
    pub compiler_flags: Vec<String>,
    /// Extra generator flags, placed between `--out=` and the spec file
    pub generator_flags: Vec<String>,
    /// Worker-pool size; 1 runs cases sequentially, 0 uses one worker per CPU
    pub jobs: usize,
    /// Per-stage timeout
    pub timeout: Option<Duration>,
    /// Stop scheduling cases after the first failure
    pub fail_fast: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            verbose: 0,
            root: PathBuf::from("."),
            cases: Vec::new(),
            conventions: Conventions::default(),
            platform: Platform::current(),
            bin_dir: PathBuf::from(DEFAULT_BIN_DIR),
            generator: None,
            compiler: None,
            compiler_flags: Vec::new(),
            generator_flags: Vec::new(),
            jobs: 1,
            timeout: None,
            fail_fast: false,
        }
    }
}

impl RunConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the verbosity level
    pub fn with_verbose(mut self, level: u8) -> Self {
        self.verbose = level;
        self
    }

    /// Set the test root
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Run exactly these case directories, in this order
    pub fn with_cases<I, P>(mut self, cases: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.cases = cases.into_iter().map(Into::into).collect();
        self
    }

    /// Set the naming conventions
    pub fn with_conventions(mut self, conventions: Conventions) -> Self {
        self.conventions = conventions;
        self
    }

    /// Use another platform's command-line profile
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Set the bin directory
    pub fn with_bin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = dir.into();
        self
    }

    /// Override the generator path
    pub fn with_generator(mut self, generator: impl Into<PathBuf>) -> Self {
        self.generator = Some(generator.into());
        self
    }

    /// Override the compiler program
    pub fn with_compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = Some(compiler.into());
        self
    }

    /// Set extra compiler flags
    pub fn with_compiler_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compiler_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    /// Set extra generator flags
    pub fn with_generator_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.generator_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the worker-pool size
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Set the per-stage timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Stop after the first failing case
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Whether commands are echoed and stdout forwarded
    pub fn echoes_commands(&self) -> bool {
        self.verbose >= VERBOSE_ECHO_LEVEL
    }

    /// Number of worker threads to use (resolves `0` to the CPU count)
    pub fn effective_jobs(&self) -> usize {
        if self.jobs == 0 { num_cpus::get().max(1) } else { self.jobs }
    }

    /// Generator executable path
    ///
    /// An explicit override is used as given; the default lives under the bin directory, which is resolved
    /// against the test root.
    pub fn generator_path(&self) -> PathBuf {
        if let Some(generator) = &self.generator {
            return generator.clone();
        }
        let profile = self.platform.profile();
        join_all(&self.root.join(&self.bin_dir), profile.generator_subdir).join(profile.generator_name)
    }

    /// Directory built executables are written to
    pub fn exe_dir(&self) -> PathBuf {
        join_all(&self.root.join(&self.bin_dir), self.platform.profile().exe_subdir)
    }

    /// Compiler program
    pub fn compiler_program(&self) -> String {
        self.compiler
            .clone()
            .unwrap_or_else(|| self.platform.profile().compiler.to_string())
    }
}

fn join_all(base: &Path, segments: &[&str]) -> PathBuf {
    segments.iter().fold(base.to_path_buf(), |dir, seg| dir.join(seg))
}

/// Split a flag string (as found in `CSC_FLAGS`) on whitespace.
pub fn split_flags(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}
