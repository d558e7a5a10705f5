//! Error types for configuration validation and loading.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    // Schema validation errors (no filesystem checks)
    #[error("no entry points specified\n\nHint: Add at least one bundle to the [entry] table, e.g. bundle = [\"./index.js\"]")]
    NoEntries,

    #[error("entry '{name}' has no modules\n\nHint: List at least one module specifier for this entry")]
    EmptyEntry { name: String },

    #[error("output directory must be an absolute path: {}\n\nHint: Relative paths are resolved against the config file; set output.path in a config file or pass an absolute path", .path.display())]
    RelativeOutputDir { path: PathBuf },

    #[error("invalid regular expression in rule #{index} ({field}): {message}")]
    InvalidPattern {
        index: usize,
        field: &'static str,
        message: String,
    },

    #[error("rule #{index} has no handlers\n\nHint: Add at least one handler to the rule's `use` list")]
    EmptyRule { index: usize },

    #[error("invalid value for '{field}'{}", .hint.as_ref().map(|h| format!("\n\nHint: {h}")).unwrap_or_default())]
    InvalidValue {
        field: String,
        hint: Option<String>,
    },

    #[error("schema validation failed: {message}{}", .hint.as_ref().map(|h| format!("\n\nHint: {h}")).unwrap_or_default())]
    SchemaValidation {
        message: String,
        hint: Option<String>,
    },

    // Filesystem validation errors
    #[error("context root not found: {}\n\nHint: Check the `context` setting; it must point at an existing directory", .path.display())]
    ContextNotFound { path: PathBuf },

    #[error("rule include path not found: {}", .path.display())]
    IncludeNotFound { path: PathBuf },

    #[error("HTML template not found: {}", .path.display())]
    TemplateNotFound { path: PathBuf },

    // Config parsing/loading errors
    #[error("config not found\n\nHint: Create bale.toml or bale.config.json, or pass --config <path>")]
    NotFound,

    #[error("config file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("unsupported configuration format: {0}\n\nHint: Use a .toml or .json file")]
    UnsupportedFormat(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
