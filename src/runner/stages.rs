//! The three pipeline stages: generate, compile, execute
//!
//! Each stage deletes the artifact it is about to produce before invoking its tool, so a failed run can never
//! leave a stale file behind for a later stage (or a later run) to pick up.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ftest_core::StageKind;
use ftest_core::naming::Conventions;

use super::discovery::TestCase;
use super::interfaces::{Stage, StageContext, StageEvents};
use super::process::{CommandLine, LAUNCH_FAILURE_STATUS, ProcessRunner, StageResult};
use super::toolchain::{CommandBuilder, PlatformCommandBuilder};
use crate::config::RunConfig;

/// Everything the stages need to invoke the external tools
pub struct Toolchain {
    runner: ProcessRunner,
    commands: Arc<dyn CommandBuilder>,
    conventions: Conventions,
    generator_flags: Vec<String>,
}

impl Toolchain {
    pub fn new(runner: ProcessRunner, commands: Arc<dyn CommandBuilder>, conventions: Conventions) -> Self {
        Self {
            runner,
            commands,
            conventions,
            generator_flags: Vec::new(),
        }
    }

    pub fn with_generator_flags(mut self, flags: Vec<String>) -> Self {
        self.generator_flags = flags;
        self
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(
            ProcessRunner::new(config.timeout),
            Arc::new(PlatformCommandBuilder::from_config(config)),
            config.conventions.clone(),
        )
        .with_generator_flags(config.generator_flags.clone())
    }

    /// Run the generator on the case's spec file.
    pub fn generate(&self, case: &TestCase, events: &mut dyn StageEvents) -> StageResult {
        let kind = StageKind::Generate;
        if let Err(result) = remove_stale(kind, &case.generated) {
            return result;
        }
        let cmd = self
            .commands
            .generate(&case.spec, &case.generated, &self.generator_flags);
        self.invoke(kind, &cmd, events)
    }

    /// Compile the generated file plus the case's hand-written sources.
    ///
    /// Returns the stage result and the path the executable was written to.
    pub fn compile(&self, case: &TestCase, events: &mut dyn StageEvents) -> (StageResult, PathBuf) {
        let kind = StageKind::Compile;
        let exe = case.executable.clone();
        if let Err(result) = remove_stale(kind, &exe) {
            return (result, exe);
        }
        if let Some(parent) = exe.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(err) = fs::create_dir_all(parent) {
                let message = format!("cannot create output directory {}: {}", parent.display(), err);
                return (local_failure(kind, message), exe);
            }
        }

        let sources = match self.collect_sources(case) {
            Ok(sources) => sources,
            Err(err) => {
                let message = format!("cannot list sources in {}: {}", case.dir.display(), err);
                return (local_failure(kind, message), exe);
            }
        };

        let cmd = self.commands.compile(&exe, &sources);
        (self.invoke(kind, &cmd, events), exe)
    }

    /// Run a built executable.
    pub fn execute(&self, executable: &Path, events: &mut dyn StageEvents) -> StageResult {
        let cmd = self.commands.execute(executable);
        self.invoke(StageKind::Execute, &cmd, events)
    }

    /// Generated file plus every source in the case directory, deduplicated and sorted.
    pub fn collect_sources(&self, case: &TestCase) -> io::Result<Vec<PathBuf>> {
        let mut sources = vec![case.generated.clone()];
        for entry in fs::read_dir(&case.dir)? {
            let entry = entry?;
            let is_source = entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.conventions.is_source_file_name(name));
            if is_source && entry.path().is_file() {
                sources.push(entry.path());
            }
        }
        sources.sort();
        sources.dedup();
        Ok(sources)
    }

    fn invoke(&self, kind: StageKind, cmd: &CommandLine, events: &mut dyn StageEvents) -> StageResult {
        events.on_command(cmd);
        self.runner.run(kind, cmd, None)
    }
}

fn remove_stale(kind: StageKind, path: &Path) -> Result<(), StageResult> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed stale artifact");
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "cannot remove stale artifact");
            Err(local_failure(
                kind,
                format!("cannot remove stale {}: {}", path.display(), err),
            ))
        }
    }
}

/// A failure detected before any process was launched.
fn local_failure(kind: StageKind, message: String) -> StageResult {
    StageResult {
        kind,
        status: LAUNCH_FAILURE_STATUS,
        stdout: String::new(),
        stderr: message + "\n",
        elapsed: None,
        timed_out: false,
    }
}

// ============================================================================
// Stage adapters
// ============================================================================

pub struct GenerateStage(pub Arc<Toolchain>);

impl Stage for GenerateStage {
    fn kind(&self) -> StageKind {
        StageKind::Generate
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> StageResult {
        self.0.generate(ctx.case, ctx.events)
    }
}

pub struct CompileStage(pub Arc<Toolchain>);

impl Stage for CompileStage {
    fn kind(&self) -> StageKind {
        StageKind::Compile
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> StageResult {
        let (result, exe) = self.0.compile(ctx.case, ctx.events);
        ctx.executable = Some(exe);
        result
    }
}

pub struct ExecuteStage(pub Arc<Toolchain>);

impl Stage for ExecuteStage {
    fn kind(&self) -> StageKind {
        StageKind::Execute
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> StageResult {
        let exe = ctx.executable().to_path_buf();
        self.0.execute(&exe, ctx.events)
    }
}

/// The standard pipeline, in order.
pub fn standard_stages(toolchain: Arc<Toolchain>) -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(GenerateStage(Arc::clone(&toolchain))),
        Box::new(CompileStage(Arc::clone(&toolchain))),
        Box::new(ExecuteStage(toolchain)),
    ]
}
