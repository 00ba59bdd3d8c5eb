//! Command-line assembly for the three external tools
//!
//! Every platform difference is resolved once, when a [`PlatformCommandBuilder`] is built from the run
//! configuration. Stages only ever talk to the [`CommandBuilder`] trait, so tests can swap in fake tools.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use ftest_core::platform::PlatformProfile;

use super::process::CommandLine;
use crate::config::RunConfig;

/// Builds the command lines for generator, compiler and test executable.
pub trait CommandBuilder: Send + Sync {
    /// `generate --out=<output> [extra-flags] <spec>`
    fn generate(&self, spec: &Path, output: &Path, extra_flags: &[String]) -> CommandLine;

    /// `compile -out:<exe> <strict-flags> -target:exe <sources>`
    fn compile(&self, executable: &Path, sources: &[PathBuf]) -> CommandLine;

    /// Run a built executable with no arguments.
    fn execute(&self, executable: &Path) -> CommandLine;
}

/// Command lines spelled according to a [`PlatformProfile`].
#[derive(Debug, Clone)]
pub struct PlatformCommandBuilder {
    profile: &'static PlatformProfile,
    generator: PathBuf,
    compiler: String,
    compiler_flags: Vec<String>,
}

impl PlatformCommandBuilder {
    pub fn new(profile: &'static PlatformProfile, generator: impl Into<PathBuf>, compiler: impl Into<String>) -> Self {
        Self {
            profile,
            generator: generator.into(),
            compiler: compiler.into(),
            compiler_flags: Vec::new(),
        }
    }

    /// Append extra compiler flags after the strict-mode flags.
    pub fn with_compiler_flags(mut self, flags: Vec<String>) -> Self {
        self.compiler_flags = flags;
        self
    }

    /// Resolve the platform profile and tool locations from the run configuration.
    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(
            config.platform.profile(),
            config.generator_path(),
            config.compiler_program(),
        )
        .with_compiler_flags(config.compiler_flags.clone())
    }
}

impl CommandBuilder for PlatformCommandBuilder {
    fn generate(&self, spec: &Path, output: &Path, extra_flags: &[String]) -> CommandLine {
        CommandLine::new(&self.generator)
            .arg(prefixed("--out=", output))
            .args(extra_flags)
            .arg(spec)
            .wrapped(self.profile.launcher)
    }

    fn compile(&self, executable: &Path, sources: &[PathBuf]) -> CommandLine {
        CommandLine::new(&self.compiler)
            .arg(prefixed(self.profile.out_flag, executable))
            .args(self.profile.strict_flags)
            .args(&self.compiler_flags)
            .arg(self.profile.target_flag)
            .args(sources)
    }

    fn execute(&self, executable: &Path) -> CommandLine {
        CommandLine::new(executable).wrapped(self.profile.launcher)
    }
}

fn prefixed(flag: &str, path: &Path) -> OsString {
    let mut arg = OsString::from(flag);
    arg.push(path);
    arg
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftest_core::platform::Platform;

    fn posix() -> PlatformCommandBuilder {
        PlatformCommandBuilder::new(Platform::Posix.profile(), "../bin/peg-sharp.exe", "gmcs")
    }

    fn windows() -> PlatformCommandBuilder {
        PlatformCommandBuilder::new(Platform::Windows.profile(), "../bin/Debug/peg-sharp.exe", "csc")
    }

    #[test]
    fn test_generate_is_wrapped_off_primary() {
        let cmd = posix().generate(Path::new("12.uri/Test12.peg"), Path::new("12.uri/Test12.cs"), &[]);
        insta::assert_snapshot!(cmd.to_string(), @"mono --debug ../bin/peg-sharp.exe --out=12.uri/Test12.cs 12.uri/Test12.peg");
    }

    #[test]
    fn test_generate_places_extra_flags_before_spec() {
        let flags = vec!["-vvv".to_string()];
        let cmd = windows().generate(Path::new("Test1.peg"), Path::new("Test1.cs"), &flags);
        insta::assert_snapshot!(cmd.to_string(), @"../bin/Debug/peg-sharp.exe --out=Test1.cs -vvv Test1.peg");
    }

    #[test]
    fn test_compile_posix_flags() {
        let sources = vec![PathBuf::from("12.uri/Custom.cs"), PathBuf::from("12.uri/Test12.cs")];
        let cmd = posix()
            .with_compiler_flags(vec!["-d:EXTRA".to_string()])
            .compile(Path::new("../bin/ftest/Test12.exe"), &sources);
        insta::assert_snapshot!(cmd.to_string(), @"gmcs -out:../bin/ftest/Test12.exe -debug+ -warnaserror+ -d:EXTRA -target:exe 12.uri/Custom.cs 12.uri/Test12.cs");
    }

    #[test]
    fn test_compile_windows_flags() {
        let sources = vec![PathBuf::from("Test1.cs")];
        let cmd = windows().compile(Path::new("Test1.exe"), &sources);
        insta::assert_snapshot!(cmd.to_string(), @"csc /out:Test1.exe -checked+ -debug+ -warn:4 -warnaserror+ -d:DEBUG -d:TRACE -d:CONTRACTS_FULL /target:exe Test1.cs");
    }

    #[test]
    fn test_compile_is_never_wrapped() {
        let cmd = posix().compile(Path::new("a.exe"), &[]);
        assert_eq!(cmd.program, OsString::from("gmcs"));
    }

    #[test]
    fn test_execute_wrapping() {
        let exe = Path::new("../bin/ftest/Test12.exe");
        assert_eq!(posix().execute(exe).to_string(), "mono --debug ../bin/ftest/Test12.exe");
        assert_eq!(windows().execute(exe).to_string(), "../bin/ftest/Test12.exe");
        assert!(windows().execute(exe).args.is_empty());
    }

    #[test]
    fn test_from_config_picks_profile() {
        let config = RunConfig::new()
            .with_platform(Platform::Posix)
            .with_root("suite")
            .with_compiler_flags(["-d:X"]);
        let builder = PlatformCommandBuilder::from_config(&config);
        let cmd = builder.compile(Path::new("t.exe"), &[]);
        assert_eq!(cmd.program, OsString::from("gmcs"));
        assert!(cmd.args.contains(&OsString::from("-d:X")));
        assert_eq!(builder.execute(Path::new("t.exe")).program, OsString::from("mono"));
    }
}
