//! Declarative transform rules.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One entry of the ordered `rules` list.
///
/// A rule applies to a module when `test` matches its path, `exclude` does not,
/// and the path lives under `include` (when set). Handlers in `use` run last to
/// first, so `["style", "css", "sass"]` compiles SCSS before injecting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TransformRule {
    /// Regular expression matched against the module path.
    pub test: String,

    /// Regular expression; matching paths are skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,

    /// Only paths under this directory match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<PathBuf>,

    /// Handler ids, e.g. `["babel-loader"]`.
    #[serde(rename = "use", alias = "handlers")]
    pub handlers: Vec<String>,
}

impl TransformRule {
    pub fn new(test: impl Into<String>, handlers: &[&str]) -> Self {
        Self {
            test: test.into(),
            exclude: None,
            include: None,
            handlers: handlers.iter().map(|h| h.to_string()).collect(),
        }
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude = Some(pattern.into());
        self
    }

    pub fn include(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include = Some(dir.into());
        self
    }
}
