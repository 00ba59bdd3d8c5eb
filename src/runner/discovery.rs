//! Test-case discovery
//!
//! Enumerates the digit-prefixed directories directly under the test root (one level, no recursion) and resolves
//! each to a [`TestCase`]. A directory that does not hold exactly one specification file still shows up, carrying
//! a [`DiscoveryError`], so it is reported as a failed case instead of silently skipped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ftest_core::naming::{Conventions, is_case_dir_name};

use super::interfaces::{DiscoveryError, RunError};
use crate::config::RunConfig;

/// One runnable test case with every artifact path derived up front
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Identifier printed in progress lines (the directory as found or as given)
    pub name: String,
    pub dir: PathBuf,
    /// The single specification file
    pub spec: PathBuf,
    /// Where the generator writes its output
    pub generated: PathBuf,
    /// Where the compiler writes the executable
    pub executable: PathBuf,
}

/// A candidate directory and what resolving it produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredCase {
    pub name: String,
    pub dir: PathBuf,
    pub case: Result<TestCase, DiscoveryError>,
}

/// Resolves case directories using the naming conventions and artifact locations of one run.
#[derive(Debug, Clone)]
pub struct Discovery {
    root: PathBuf,
    explicit: Vec<PathBuf>,
    conventions: Conventions,
    exe_dir: PathBuf,
}

impl Discovery {
    pub fn new(root: impl Into<PathBuf>, conventions: Conventions, exe_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            explicit: Vec::new(),
            conventions,
            exe_dir: exe_dir.into(),
        }
    }

    /// Use these directories, in this order, instead of scanning the root.
    ///
    /// Relative entries are resolved against the root; the entry as given is the case identifier.
    pub fn with_explicit(mut self, dirs: Vec<PathBuf>) -> Self {
        self.explicit = dirs;
        self
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(&config.root, config.conventions.clone(), config.exe_dir()).with_explicit(config.cases.clone())
    }

    /// All cases for this run, in the order they will be reported.
    ///
    /// Explicit directories bypass the root scan and the digit-prefix rule entirely.
    #[tracing::instrument(skip(self), fields(root = %self.root.display()))]
    pub fn discover(&self) -> Result<Vec<DiscoveredCase>, RunError> {
        let dirs: Vec<(String, PathBuf)> = if self.explicit.is_empty() {
            self.case_dirs()?
                .into_iter()
                .map(|dir| (dir_label(&dir), dir))
                .collect()
        } else {
            self.explicit
                .iter()
                .map(|dir| (dir.display().to_string(), self.root.join(dir)))
                .collect()
        };

        let cases: Vec<DiscoveredCase> = dirs
            .into_iter()
            .map(|(name, dir)| DiscoveredCase {
                case: self.resolve(&name, &dir),
                name,
                dir,
            })
            .collect();
        tracing::debug!(count = cases.len(), "discovered test cases");
        Ok(cases)
    }

    /// Digit-prefixed directories directly under the root, sorted by name.
    pub fn case_dirs(&self) -> Result<Vec<PathBuf>, RunError> {
        let entries = fs::read_dir(&self.root).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => RunError::RootMissing(self.root.clone()),
            _ => RunError::RootUnreadable {
                path: self.root.clone(),
                source,
            },
        })?;

        let mut dirs = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(root = %self.root.display(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let path = entry.path();
            if is_case_dir_name(name) && path.is_dir() {
                dirs.push(path);
            }
        }
        dirs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(dirs)
    }

    /// Resolve one directory to a runnable case.
    pub fn resolve(&self, name: &str, dir: &Path) -> Result<TestCase, DiscoveryError> {
        let specs = self.spec_files(dir)?;
        let [spec] = specs.as_slice() else {
            return Err(DiscoveryError::SpecCount {
                dir: dir.to_path_buf(),
                pattern: self.conventions.spec_pattern(),
                count: specs.len(),
            });
        };

        let executable = self
            .conventions
            .executable_path(&self.exe_dir, dir, spec)
            .or_else(|| {
                // `..` and friends have no name of their own; use the directory they point at.
                let canonical = fs::canonicalize(dir).ok()?;
                self.conventions.executable_path(&self.exe_dir, &canonical, spec)
            })
            .unwrap_or_else(|| self.exe_dir.join(format!("{}.{}", name, self.conventions.exe_ext)));

        Ok(TestCase {
            name: name.to_string(),
            dir: dir.to_path_buf(),
            spec: spec.clone(),
            generated: self.conventions.generated_path(spec),
            executable,
        })
    }

    fn spec_files(&self, dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
        let entries = fs::read_dir(dir).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => DiscoveryError::Missing(dir.to_path_buf()),
            _ => DiscoveryError::Unreadable {
                dir: dir.to_path_buf(),
                message: err.to_string(),
            },
        })?;

        let mut specs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| self.conventions.is_spec_file_name(name))
            })
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        specs.sort();
        Ok(specs)
    }
}

fn dir_label(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}
