//! # bale-bundler
//!
//! Turns a validated [`BuildConfig`] into a deterministic set of browser assets.
//!
//! The pipeline resolves every entry point, walks the dependency graph in
//! parallel waves, runs the first matching rule's handler chain on each module,
//! moves modules shared between entries into a shared chunk, renders one script
//! per chunk and writes the result atomically. Plugins observe and modify the
//! build at four hooks.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bale_bundler::Bundler;
//! use bale_config::BuildConfig;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BuildConfig::from_value(
//!     json!({
//!         "entry": { "bundle": ["./src/index.js"] },
//!         "output": { "path": "dist" }
//!     }),
//!     "/path/to/project",
//! )?;
//!
//! let result = Bundler::new(config)?.build()?;
//! for file in &result.emitted_files {
//!     println!("{} ({} bytes)", file.path.display(), file.size);
//! }
//! # Ok(()) }
//! ```
//!
//! ### Bundle in memory
//!
//! ```no_run
//! use bale_bundler::{Bundler, runtime::BundlerRuntime};
//! use bale_config::BuildConfig;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = BundlerRuntime::in_memory("/app");
//! runtime.add_virtual_file("/app/index.js", "export default 42;");
//!
//! let mut config = BuildConfig::default();
//! config.entry.insert("main".into(), vec!["./index.js".into()]);
//! config.resolve_paths("/app".as_ref());
//!
//! let output = Bundler::new(config)?.with_runtime(Arc::new(runtime)).bundle()?;
//! assert!(output.assets.get("main.js").is_some());
//! # Ok(()) }
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub mod bundler;
pub mod chunk;
pub mod diagnostics;
pub mod graph;
pub mod handlers;
pub mod output;
pub mod plugins;
pub mod render;
pub mod resolver;
pub mod rules;
pub mod runtime;
pub mod scan;

pub use bale_config::BuildConfig;
pub use bundler::{BuildContext, BuildOutput, BuildResult, BuildStats, Bundler, EmittedFile};
pub use chunk::{Chunk, ChunkKind};
pub use diagnostics::{Diagnostic, DiagnosticSeverity};
pub use graph::{Module, ModuleGraph, ModuleId};
pub use handlers::{Handler, HandlerRegistry, ModuleSource, SourceKind};
pub use output::{Asset, Assets};
pub use plugins::{Plugin, PluginRegistry};
pub use runtime::{BundlerRuntime, NativeRuntime, Runtime};

/// Error types for bale-bundler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration provided.
    #[error(transparent)]
    Config(#[from] bale_config::ConfigError),

    /// A rule names a handler that is not registered.
    #[error("unknown handler '{id}' in rule #{rule}\n\nHint: Built-in handlers are babel, sass, css, style, json and raw (with or without the -loader suffix)")]
    UnknownHandler { id: String, rule: usize },

    /// Two assets would be written to the same file.
    #[error("output file '{filename}' is produced twice\n\nHint: Include [name] in the file name patterns so every chunk gets its own file")]
    OutputCollision { filename: String },

    /// A specifier could not be mapped to a file.
    #[error("cannot resolve '{specifier}'{}", .importer.as_ref().map(|p| format!(" from {}", p.display())).unwrap_or_default())]
    Resolution {
        specifier: String,
        importer: Option<PathBuf>,
    },

    /// A handler chain failed and `bail` is enabled.
    #[error("{handler} failed for {}: {message}", .path.display())]
    Transform {
        path: PathBuf,
        handler: String,
        message: String,
    },

    /// A plugin hook returned an error.
    #[error("plugin '{plugin}' failed during {hook}: {message}")]
    Plugin {
        plugin: String,
        hook: &'static str,
        message: String,
    },

    /// Invalid output path (e.g., directory traversal attempt).
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    /// File write operation failed.
    #[error("Write failure: {0}")]
    WriteFailure(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error with context message.
    #[error("{message}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for bale-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error category, shared by [`Error`] and [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Config,
    Resolution,
    Transform,
    Plugin,
    Io,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Resolution => "resolution",
            ErrorKind::Transform => "transform",
            ErrorKind::Plugin => "plugin",
            ErrorKind::Io => "io",
        }
    }

    /// Stable diagnostic code, e.g. `RESOLUTION_ERROR`.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Config => "CONFIG_ERROR",
            ErrorKind::Resolution => "RESOLUTION_ERROR",
            ErrorKind::Transform => "TRANSFORM_ERROR",
            ErrorKind::Plugin => "PLUGIN_ERROR",
            ErrorKind::Io => "IO_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) | Error::UnknownHandler { .. } | Error::OutputCollision { .. } => {
                ErrorKind::Config
            }
            Error::Resolution { .. } => ErrorKind::Resolution,
            Error::Transform { .. } => ErrorKind::Transform,
            Error::Plugin { .. } => ErrorKind::Plugin,
            Error::InvalidOutputPath(_)
            | Error::WriteFailure(_)
            | Error::Io(_)
            | Error::IoError { .. } => ErrorKind::Io,
        }
    }

    /// Wrap an I/O error with a message naming what was being done.
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Error::IoError {
            message: message.into(),
            source,
        }
    }
}

impl miette::Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(self.kind().code()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let help = match self {
            Error::Resolution { specifier, .. } if !specifier.starts_with('.') => format!(
                "'{specifier}' is looked up in resolve.modules directories; is the package installed?"
            ),
            Error::Resolution { .. } => "Check the path and the resolve.extensions list".to_string(),
            Error::Transform { .. } => {
                "Set bail = false to keep building and report the failure as a diagnostic"
                    .to_string()
            }
            _ => return None,
        };
        Some(Box::new(help))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_codes() {
        let err = Error::Resolution {
            specifier: "./missing".into(),
            importer: Some(PathBuf::from("/app/a.js")),
        };
        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert_eq!(err.kind().code(), "RESOLUTION_ERROR");
        assert_eq!(err.to_string(), "cannot resolve './missing' from /app/a.js");

        let err = Error::from(bale_config::ConfigError::NoEntries);
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(ErrorKind::Io.as_str(), "io");
    }
}
