//! The build description consumed by the bundler.
//!
//! `BuildConfig` is the in-memory model of a `bale.toml` / `bale.config.json`
//! file. It is constructed once per invocation and treated as immutable after
//! [`BuildConfig::resolve_paths`] and validation have run.

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::dev::DevServerConfig;
use crate::error::{ConfigError, Result};
use crate::plugin::PluginConfig;
use crate::rule::TransformRule;

/// Complete build description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BuildConfig {
    /// Context root. Entry specifiers and rule `include` paths resolve against it.
    #[serde(default = "default_context")]
    pub context: PathBuf,

    /// Entry points: bundle name to ordered module specifiers.
    #[serde(default)]
    pub entry: IndexMap<String, Vec<String>>,

    #[serde(default)]
    pub output: OutputConfig,

    /// Transform rules, evaluated in declaration order.
    #[serde(default)]
    pub rules: Vec<TransformRule>,

    /// Plugins, invoked in declaration order at every hook.
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,

    #[serde(default)]
    pub shared_chunk: SharedChunkConfig,

    #[serde(default)]
    pub resolve: ResolveConfig,

    #[serde(default)]
    pub devtool: Devtool,

    /// Abort the whole build on the first transform error.
    #[serde(default)]
    pub bail: bool,

    #[serde(default)]
    pub dev_server: DevServerConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            context: default_context(),
            entry: IndexMap::new(),
            output: OutputConfig::default(),
            rules: Vec::new(),
            plugins: Vec::new(),
            shared_chunk: SharedChunkConfig::default(),
            resolve: ResolveConfig::default(),
            devtool: Devtool::default(),
            bail: false,
            dev_server: DevServerConfig::default(),
        }
    }
}

impl BuildConfig {
    /// Create from serde_json::Value (for programmatic config built in memory)
    ///
    /// Relative paths are resolved against `base_dir`, then the result is
    /// schema-validated. No filesystem access happens here; run
    /// [`crate::validate_fs`] before building.
    ///
    /// # Example
    ///
    /// ```
    /// use bale_config::BuildConfig;
    /// use serde_json::json;
    ///
    /// let value = json!({
    ///     "entry": { "bundle": ["./index.js"] },
    ///     "output": { "path": "dist" }
    /// });
    ///
    /// let config = BuildConfig::from_value(value, "/project").unwrap();
    /// assert_eq!(config.entry["bundle"], vec!["./index.js".to_string()]);
    /// assert!(config.output.path.is_absolute());
    /// ```
    pub fn from_value(value: Value, base_dir: impl AsRef<Path>) -> Result<Self> {
        let mut config: BuildConfig =
            serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
                field: "config".to_string(),
                hint: Some(e.to_string()),
            })?;
        config.resolve_paths(base_dir.as_ref());
        crate::validate_schema(&config)?;
        Ok(config)
    }

    /// Convert to serde_json::Value
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Resolve every relative path in the description against `base_dir`.
    ///
    /// Entry specifiers are left untouched; they are module specifiers resolved
    /// by the bundler against `context`.
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        self.context = absolutize(&self.context, base_dir);
        self.output.path = absolutize(&self.output.path, base_dir);

        if let Some(content_base) = &self.dev_server.content_base {
            self.dev_server.content_base = Some(absolutize(content_base, base_dir));
        }

        for rule in &mut self.rules {
            if let Some(include) = &rule.include {
                rule.include = Some(absolutize(include, base_dir));
            }
        }

        for plugin in &mut self.plugins {
            if let PluginConfig::Html(html) = plugin {
                if let Some(template) = &html.template {
                    html.template = Some(absolutize(template, base_dir));
                }
            }
        }
    }

    /// Directory served by the dev server.
    pub fn content_base(&self) -> &Path {
        self.dev_server
            .content_base
            .as_deref()
            .unwrap_or(&self.output.path)
    }
}

fn absolutize(path: &Path, base_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        let joined = base_dir.join(path);
        // Keep `./dist` and `dist` equal so identical configs stay identical.
        joined
            .components()
            .filter(|c| !matches!(c, std::path::Component::CurDir))
            .collect()
    }
}

/// Output location and naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OutputConfig {
    /// Output directory. Must be absolute once loaded.
    #[serde(default = "default_output_path")]
    pub path: PathBuf,

    /// URL prefix for emitted files (used in generated HTML).
    #[serde(default = "default_public_path")]
    pub public_path: String,

    /// File name pattern for entry chunks.
    ///
    /// Supports `[name]`, `[contenthash]` and `[contenthash:N]`.
    #[serde(default = "default_filename")]
    pub filename: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            public_path: default_public_path(),
            filename: default_filename(),
        }
    }
}

/// Common-code extraction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SharedChunkConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Chunk name. An entry with the same name becomes the shared chunk.
    #[serde(default = "default_shared_name")]
    pub name: String,

    /// File name pattern for the shared chunk. Falls back to `output.filename`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Minimum number of entries that must reach a module before it moves.
    #[serde(default)]
    pub min_chunks: MinChunks,
}

impl Default for SharedChunkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: default_shared_name(),
            filename: None,
            min_chunks: MinChunks::default(),
        }
    }
}

/// Reference-count threshold for the shared chunk.
///
/// Serialized as a number, or the string `"Infinity"` to keep only the
/// modules of an entry named like the shared chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinChunks {
    Count(usize),
    Infinity,
}

impl MinChunks {
    /// Whether a module reached by `count` entries belongs in the shared chunk.
    pub fn is_met_by(self, count: usize) -> bool {
        match self {
            MinChunks::Count(min) => count >= min,
            MinChunks::Infinity => false,
        }
    }
}

impl Default for MinChunks {
    fn default() -> Self {
        MinChunks::Count(2)
    }
}

impl fmt::Display for MinChunks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MinChunks::Count(n) => write!(f, "{n}"),
            MinChunks::Infinity => f.write_str("Infinity"),
        }
    }
}

impl Serialize for MinChunks {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            MinChunks::Count(n) => serializer.serialize_u64(*n as u64),
            MinChunks::Infinity => serializer.serialize_str("Infinity"),
        }
    }
}

impl<'de> Deserialize<'de> for MinChunks {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(u64),
            Word(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Count(n) => Ok(MinChunks::Count(n as usize)),
            Raw::Word(word) if word.eq_ignore_ascii_case("infinity") => Ok(MinChunks::Infinity),
            Raw::Word(word) => Err(serde::de::Error::custom(format!(
                "expected a number or \"Infinity\", found \"{word}\""
            ))),
        }
    }
}

/// Module resolution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResolveConfig {
    /// Extensions tried, in order, for specifiers without a matching file.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory names searched (walking upwards) for bare specifiers.
    #[serde(default = "default_modules")]
    pub modules: Vec<String>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            modules: default_modules(),
        }
    }
}

/// Source map generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Devtool {
    #[default]
    None,
    SourceMap,
}

fn default_context() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("dist")
}

fn default_public_path() -> String {
    "/".to_string()
}

fn default_filename() -> String {
    "[name].js".to_string()
}

fn default_shared_name() -> String {
    "vendor".to_string()
}

fn default_extensions() -> Vec<String> {
    [".js", ".mjs", ".json", ".scss", ".css"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_modules() -> Vec<String> {
    vec!["node_modules".to_string()]
}

pub(crate) fn default_true() -> bool {
    true
}
