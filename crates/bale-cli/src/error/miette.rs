//! Miette diagnostic conversion for CLI errors.

use bale_bundler::diagnostics::{Diagnostic, to_diagnostic_error};
use miette::Report;

use crate::error::CliError;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        // Routed through the bundler error so the report carries CONFIG_ERROR.
        CliError::Config(e) => Report::new(bale_bundler::Error::from(e)),
        CliError::Bundler(e) => Report::new(e),
        _ => miette::miette!("{}", err),
    }
}

/// Convert a build diagnostic to a miette Report
pub fn diagnostic_to_miette(diag: Diagnostic) -> Report {
    Report::new(to_diagnostic_error(diag))
}
