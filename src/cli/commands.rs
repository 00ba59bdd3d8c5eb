//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::io::{self, Write};

use crate::config::RunConfig;
use crate::runner::{ConsoleReporter, Discovery, Orchestrator, run_suite};

use super::{CliError, CliResult, ExitCode};

/// Run every case and exit with the number of failures.
pub fn run_tests(config: &RunConfig) -> CliResult<ExitCode> {
    let orchestrator = Orchestrator::from_config(config);
    let mut reporter = ConsoleReporter::stdio(config.echoes_commands());
    let status = run_suite(config, &orchestrator, &mut reporter).map_err(CliError::diagnostic)?;
    Ok(ExitCode(status))
}

/// Print the cases a run would execute, marking the ones discovery rejected.
pub fn list_cases(config: &RunConfig) -> CliResult<ExitCode> {
    let cases = Discovery::from_config(config)
        .discover()
        .map_err(CliError::diagnostic)?;

    let mut out = io::stdout().lock();
    for discovered in &cases {
        let line = match &discovered.case {
            Ok(case) => format!("{} ({})", discovered.name, case.spec.display()),
            Err(err) => format!("{} (invalid: {})", discovered.name, err),
        };
        writeln!(out, "{}", line).map_err(|e| CliError::failure(format!("Error writing case list: {}", e)))?;
    }
    Ok(ExitCode::SUCCESS)
}
