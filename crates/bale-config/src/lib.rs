//! Build descriptions for the bale bundler.
//!
//! A [`BuildConfig`] names the entry points, transform rules, plugins, output
//! location and dev server settings of one project. It can be built in memory,
//! from a `serde_json::Value`, or discovered on disk (`bale.toml`,
//! `bale.config.json`, or the `bale` field of `package.json`).

pub mod config;
pub mod dev;
pub mod discovery;
pub mod error;
pub mod plugin;
pub mod rule;
pub mod validation;

// Re-export main types
pub use config::*;
pub use dev::*;
pub use error::*;
pub use plugin::*;
pub use rule::*;

// Re-export discovery and validation
pub use discovery::{CONFIG_FILES, ConfigDiscovery, discover, load_config};
pub use validation::{ConfigValidator, FsValidator, SchemaValidator, validate_fs, validate_schema};
