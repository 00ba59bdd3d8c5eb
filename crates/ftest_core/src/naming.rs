//! Test-case naming conventions.
//!
//! A test-case directory is any directory whose name starts with an ASCII digit (`01-basic`, `7.sub-rules`).
//! Inside it lives exactly one specification file named `<prefix>*.<spec-ext>` plus any number of hand-written
//! sources. The generated source sits next to the specification file, and the executable is built into a
//! per-case sub-directory of the output directory named after the case directory, so two cases with the same
//! specification file name never write to the same path.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Default specification-file name prefix.
pub const DEFAULT_SPEC_PREFIX: &str = "Test";

/// Default specification-file extension.
pub const DEFAULT_SPEC_EXT: &str = "peg";

/// Default extension of the file written by the generator.
pub const DEFAULT_GENERATED_EXT: &str = "cs";

/// Default extension of hand-written sources collected for compilation.
pub const DEFAULT_SOURCE_EXT: &str = "cs";

/// Default extension of the built executable.
pub const DEFAULT_EXE_EXT: &str = "exe";

/// Return whether a directory name marks a test case.
///
/// ## Examples
/// ```rust
/// use ftest_core::naming::is_case_dir_name;
///
/// assert!(is_case_dir_name("01-basic"));
/// assert!(!is_case_dir_name("bin"));
/// assert!(!is_case_dir_name(""));
/// ```
pub fn is_case_dir_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// File-naming rules for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conventions {
    /// Required prefix of the specification file name.
    pub spec_prefix: String,
    /// Extension of the specification file (without the dot).
    pub spec_ext: String,
    /// Extension the generated source is written with.
    pub generated_ext: String,
    /// Extension of sources collected for compilation.
    pub source_ext: String,
    /// Extension of the built executable.
    pub exe_ext: String,
}

impl Default for Conventions {
    fn default() -> Self {
        Self {
            spec_prefix: DEFAULT_SPEC_PREFIX.to_string(),
            spec_ext: DEFAULT_SPEC_EXT.to_string(),
            generated_ext: DEFAULT_GENERATED_EXT.to_string(),
            source_ext: DEFAULT_SOURCE_EXT.to_string(),
            exe_ext: DEFAULT_EXE_EXT.to_string(),
        }
    }
}

impl Conventions {
    /// Set the specification-file extension.
    pub fn with_spec_ext(mut self, ext: impl Into<String>) -> Self {
        self.spec_ext = ext.into();
        self
    }

    /// Set the generated-source extension.
    pub fn with_generated_ext(mut self, ext: impl Into<String>) -> Self {
        self.generated_ext = ext.into();
        self
    }

    /// Set the extension of collected sources.
    pub fn with_source_ext(mut self, ext: impl Into<String>) -> Self {
        self.source_ext = ext.into();
        self
    }

    /// Set the executable extension.
    pub fn with_exe_ext(mut self, ext: impl Into<String>) -> Self {
        self.exe_ext = ext.into();
        self
    }

    /// Glob-style pattern for display (`Test*.peg`).
    pub fn spec_pattern(&self) -> String {
        format!("{}*.{}", self.spec_prefix, self.spec_ext)
    }

    /// Return whether a file name matches `<prefix>*.<spec-ext>`.
    ///
    /// ## Notes
    /// - Matching is case-sensitive.
    /// - The `*` may match the empty string, so `Test.peg` qualifies.
    pub fn is_spec_file_name(&self, name: &str) -> bool {
        let suffix_len = self.spec_ext.len() + 1;
        name.len() >= self.spec_prefix.len() + suffix_len
            && name.starts_with(self.spec_prefix.as_str())
            && has_extension(name, &self.spec_ext)
    }

    /// Return whether a file name is a compilable source.
    pub fn is_source_file_name(&self, name: &str) -> bool {
        has_extension(name, &self.source_ext)
    }

    /// Path the generator writes to: the spec path with its extension replaced.
    pub fn generated_path(&self, spec: &Path) -> PathBuf {
        spec.with_extension(&self.generated_ext)
    }

    /// File name of the executable built for a spec (`TestBasic.peg` -> `TestBasic.exe`).
    ///
    /// ## Returns
    /// - `None` when the spec path has no file stem.
    pub fn executable_name(&self, spec: &Path) -> Option<OsString> {
        let mut name = spec.file_stem()?.to_os_string();
        if !self.exe_ext.is_empty() {
            name.push(".");
            name.push(&self.exe_ext);
        }
        Some(name)
    }

    /// Where the executable for a case is built: `<exe_dir>/<case dir name>/<spec stem>.<exe-ext>`.
    ///
    /// ## Returns
    /// - `None` when the case directory has no final name component (`..`) or the spec path has no file stem.
    pub fn executable_path(&self, exe_dir: &Path, case_dir: &Path, spec: &Path) -> Option<PathBuf> {
        let case = case_dir.file_name()?;
        Some(exe_dir.join(case).join(self.executable_name(spec)?))
    }
}

fn has_extension(name: &str, ext: &str) -> bool {
    name.len() > ext.len() && name.ends_with(ext) && name[..name.len() - ext.len()].ends_with('.')
}
