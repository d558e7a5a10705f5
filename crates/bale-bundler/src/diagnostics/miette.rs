//! Miette diagnostic conversion for bale-bundler diagnostics.
//!
//! Build diagnostics are plain data; the CLI wraps each one in a
//! [`DiagnosticError`] to render it through miette's report handler.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, Severity};

use crate::diagnostics::{Diagnostic, DiagnosticSeverity};

/// Wrapper error type that implements miette's `Diagnostic` for [`Diagnostic`]
#[derive(Debug)]
pub struct DiagnosticError {
    diag: Diagnostic,
}

impl DiagnosticError {
    pub fn diagnostic(&self) -> &Diagnostic {
        &self.diag
    }
}

impl std::error::Error for DiagnosticError {}

impl fmt::Display for DiagnosticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.diag.file {
            Some(file) => write!(f, "{}: {}", file, self.diag.message),
            None => f.write_str(&self.diag.message),
        }
    }
}

impl MietteDiagnostic for DiagnosticError {
    fn code(&self) -> Option<Box<dyn fmt::Display + '_>> {
        Some(Box::new(self.diag.kind.code()))
    }

    fn severity(&self) -> Option<Severity> {
        Some(match self.diag.severity {
            DiagnosticSeverity::Error => Severity::Error,
            DiagnosticSeverity::Warning => Severity::Warning,
        })
    }

    fn help(&self) -> Option<Box<dyn fmt::Display + '_>> {
        self.diag
            .help
            .as_ref()
            .map(|h| Box::new(h.clone()) as Box<dyn fmt::Display>)
    }
}

/// Convert a build diagnostic into something miette can report.
pub fn to_diagnostic_error(diag: Diagnostic) -> DiagnosticError {
    DiagnosticError { diag }
}
