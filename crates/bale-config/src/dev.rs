//! Development server configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DevServerConfig {
    /// Directory to serve. Defaults to `output.path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_base: Option<PathBuf>,

    /// Serve `index` for unmatched navigation requests (client-side routing).
    #[serde(default)]
    pub history_api_fallback: bool,

    /// Fallback document, relative to the content base.
    #[serde(default = "default_index")]
    pub index: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Debounce window for watch mode rebuilds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            content_base: None,
            history_api_fallback: false,
            index: default_index(),
            host: default_host(),
            port: default_port(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_index() -> String {
    "index.html".into()
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8080
}

fn default_debounce_ms() -> u64 {
    100
}
