//! Per-platform command-line strategy table.
//!
//! The driver runs on two kinds of host. On the primary platform the generator, the compiler and the built test
//! executables are native and invoked directly. Everywhere else they are managed executables that have to be
//! started through a runtime launcher, and a different compiler front-end with different flag spelling is used.
//!
//! All platform differences live in [`PROFILES`]; callers resolve a profile once at startup with
//! [`Platform::current`] and never branch on the platform again.
//!
//! ## Notes
//! - Profiles are `const` data so they can be inspected (and tested) on any host.

/// Host platform families the driver distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Primary platform: tools run natively.
    Windows,
    /// Non-primary platforms: tools run under the managed-runtime launcher.
    Posix,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub const fn current() -> Platform {
        if cfg!(windows) { Platform::Windows } else { Platform::Posix }
    }

    /// The command-line profile for this platform.
    pub const fn profile(self) -> &'static PlatformProfile {
        match self {
            Platform::Windows => &WINDOWS_PROFILE,
            Platform::Posix => &POSIX_PROFILE,
        }
    }

    /// Stable lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Posix => "posix",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How to spell tool invocations on one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformProfile {
    pub platform: Platform,
    /// Prefix prepended to every managed-executable invocation (empty on the primary platform).
    pub launcher: &'static [&'static str],
    /// Compiler front-end program.
    pub compiler: &'static str,
    /// Output-path flag; the executable path is appended directly (`-out:Test.exe`).
    pub out_flag: &'static str,
    /// Flag requesting a console executable.
    pub target_flag: &'static str,
    /// Strict mode: warnings are errors, debug symbols on.
    pub strict_flags: &'static [&'static str],
    /// Sub-directories of the bin directory holding the generator.
    pub generator_subdir: &'static [&'static str],
    /// Sub-directories of the bin directory receiving built test executables.
    pub exe_subdir: &'static [&'static str],
    /// File name of the generator tool.
    pub generator_name: &'static str,
}

/// Managed-runtime launcher used off the primary platform.
pub const MANAGED_LAUNCHER: &[&str] = &["mono", "--debug"];

/// Generator executable name.
pub const GENERATOR_NAME: &str = "peg-sharp.exe";

/// Primary platform: native tools, `csc` front-end.
pub const WINDOWS_PROFILE: PlatformProfile = PlatformProfile {
    platform: Platform::Windows,
    launcher: &[],
    compiler: "csc",
    out_flag: "/out:",
    target_flag: "/target:exe",
    strict_flags: &[
        "-checked+",
        "-debug+",
        "-warn:4",
        "-warnaserror+",
        "-d:DEBUG",
        "-d:TRACE",
        "-d:CONTRACTS_FULL",
    ],
    generator_subdir: &["Debug"],
    exe_subdir: &["Debug"],
    generator_name: GENERATOR_NAME,
};

/// Everywhere else: managed tools under the launcher, `gmcs` front-end.
pub const POSIX_PROFILE: PlatformProfile = PlatformProfile {
    platform: Platform::Posix,
    launcher: MANAGED_LAUNCHER,
    compiler: "gmcs",
    out_flag: "-out:",
    target_flag: "-target:exe",
    strict_flags: &["-debug+", "-warnaserror+"],
    generator_subdir: &[],
    exe_subdir: &["ftest"],
    generator_name: GENERATOR_NAME,
};

/// Every profile, one per [`Platform`] variant.
pub const PROFILES: &[PlatformProfile] = &[WINDOWS_PROFILE, POSIX_PROFILE];
