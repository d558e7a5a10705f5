//! Declarative plugin entries.
//!
//! Each entry of the `plugins` list names one of the bundler's built-in
//! plugins. Order is significant: the bundler invokes plugins at every hook in
//! the order they are listed here.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum PluginConfig {
    /// Generate an HTML document referencing every emitted chunk.
    #[serde(alias = "html-webpack-plugin")]
    Html(HtmlOptions),

    /// Use context-relative module paths as module ids.
    #[serde(alias = "named-modules-plugin")]
    NamedModules,

    /// Prepend a comment to emitted assets.
    Banner(BannerOptions),

    /// Emit a JSON map of chunk name to file name.
    Manifest(ManifestOptions),
}

impl PluginConfig {
    /// Stable plugin name, as written in the config file.
    pub fn name(&self) -> &'static str {
        match self {
            PluginConfig::Html(_) => "html",
            PluginConfig::NamedModules => "named-modules",
            PluginConfig::Banner(_) => "banner",
            PluginConfig::Manifest(_) => "manifest",
        }
    }
}

/// HTML generation options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlOptions {
    /// Output filename for generated HTML (default: "index.html")
    #[serde(default = "default_html_filename")]
    pub filename: String,

    /// Path to an HTML template. Script tags are injected before `</body>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,

    /// Page title for the generated document (ignored with a template)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Inject script tags for the emitted chunks
    #[serde(default = "crate::config::default_true")]
    pub inject: bool,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            filename: default_html_filename(),
            template: None,
            title: None,
            inject: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BannerOptions {
    pub banner: String,

    /// Regular expression selecting asset file names; defaults to scripts and styles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestOptions {
    #[serde(default = "default_manifest_filename")]
    pub filename: String,
}

impl Default for ManifestOptions {
    fn default() -> Self {
        Self {
            filename: default_manifest_filename(),
        }
    }
}

fn default_html_filename() -> String {
    "index.html".to_string()
}

fn default_manifest_filename() -> String {
    "manifest.json".to_string()
}
