//! File-based config discovery for CLI use
//!
//! Handles finding and loading bale configuration files from the filesystem.
//! Sources are layered with figment: built-in defaults, then the config file,
//! then `BALE_`-prefixed environment variables.

use std::fs;
use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized, Toml},
};
use serde_json::Value;

use crate::config::BuildConfig;
use crate::error::{ConfigError, Result};

/// Conventional config file names, in lookup order.
pub const CONFIG_FILES: &[&str] = &["bale.toml", "bale.config.json"];

/// Field of `package.json` holding an embedded config.
const PACKAGE_FIELD: &str = "bale";

/// File-based configuration discovery
///
/// Searches for bale configuration files in conventional locations and loads
/// them. This is primarily for CLI use; library users should build a
/// [`BuildConfig`] directly or go through `BuildConfig::from_value()`.
///
/// # Example
///
/// ```no_run
/// use bale_config::ConfigDiscovery;
///
/// let discovery = ConfigDiscovery::new(".");
/// let config = discovery.load().unwrap();
/// ```
pub struct ConfigDiscovery {
    root: PathBuf,
}

impl ConfigDiscovery {
    /// Create a new config discovery with a root directory
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Find a config file in the root directory
    ///
    /// Searches in this order:
    /// 1. TOML config: bale.toml
    /// 2. JSON config: bale.config.json
    /// 3. package.json (bale field)
    pub fn find(&self) -> Option<PathBuf> {
        for name in CONFIG_FILES {
            let path = self.root.join(name);
            if path.is_file() {
                return Some(path);
            }
        }

        let pkg_path = self.root.join("package.json");
        if pkg_path.is_file() {
            if let Ok(content) = fs::read_to_string(&pkg_path) {
                if let Ok(parsed) = serde_json::from_str::<Value>(&content) {
                    if parsed.get(PACKAGE_FIELD).is_some_and(|v| !v.is_null()) {
                        return Some(pkg_path);
                    }
                }
            }
        }

        None
    }

    /// Load config from discovered file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if no config file is found.
    pub fn load(&self) -> Result<BuildConfig> {
        let path = self.find().ok_or(ConfigError::NotFound)?;
        load_config(&path)
    }
}

/// Load, resolve and validate the config at `path`.
///
/// Relative paths inside the file resolve against the file's directory. The
/// result has passed both schema and filesystem validation.
///
/// # Errors
///
/// `FileNotFound` when `path` does not exist, `UnsupportedFormat` for unknown
/// extensions, `Parse` for syntax or type errors, and any validation error.
pub fn load_config(path: &Path) -> Result<BuildConfig> {
    if !path.is_file() {
        return Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let base_dir = match path.parent() {
        Some(parent) if parent.is_absolute() => parent.to_path_buf(),
        Some(parent) => std::env::current_dir()?.join(parent),
        None => std::env::current_dir()?,
    };

    let kind = source_kind(path)?;
    let figment = Figment::new().merge(Serialized::defaults(BuildConfig::default()));
    let figment = match kind {
        SourceKind::Toml => figment.merge(Toml::file(path)),
        SourceKind::Json => figment.merge(Json::file(path)),
        SourceKind::PackageJson => {
            figment.merge(Serialized::defaults(read_package_field(path)?))
        }
    };

    let mut value: Value = figment.merge(env_provider()).extract()?;
    normalize_keys(&mut value);
    let mut config: BuildConfig =
        serde_json::from_value(value).map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
    restore_entry_order(&mut config, &declared_entries(path, &kind)?);
    config.resolve_paths(&base_dir);
    crate::validate_fs(&config)?;

    tracing::debug!(
        path = %path.display(),
        entries = config.entry.len(),
        rules = config.rules.len(),
        plugins = config.plugins.len(),
        "loaded build config"
    );

    Ok(config)
}

/// Discover and load config from current directory (convenience function)
///
/// # Example
///
/// ```no_run
/// use bale_config::discover;
///
/// let config = discover().unwrap();
/// ```
pub fn discover() -> Result<BuildConfig> {
    let root = std::env::current_dir()?;
    ConfigDiscovery::new(&root).load()
}

enum SourceKind {
    Toml,
    Json,
    PackageJson,
}

fn source_kind(path: &Path) -> Result<SourceKind> {
    if path.file_name().and_then(|n| n.to_str()) == Some("package.json") {
        return Ok(SourceKind::PackageJson);
    }

    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Ok(SourceKind::Toml),
        Some("json") => Ok(SourceKind::Json),
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

fn read_package_field(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)?;
    let parsed: Value = serde_json::from_str(&content)
        .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;

    match parsed.get(PACKAGE_FIELD) {
        Some(value) if !value.is_null() => Ok(value.clone()),
        _ => Err(ConfigError::InvalidValue {
            field: PACKAGE_FIELD.to_string(),
            hint: Some("Add a 'bale' field to your package.json".to_string()),
        }),
    }
}

/// Entry names in the order the file declares them.
fn declared_entries(path: &Path, kind: &SourceKind) -> Result<Vec<String>> {
    let names = match kind {
        SourceKind::Toml => {
            let table: toml::Table = toml::from_str(&fs::read_to_string(path)?)
                .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
            match table.get("entry") {
                Some(toml::Value::Table(entry)) => entry.keys().cloned().collect(),
                _ => Vec::new(),
            }
        }
        SourceKind::Json => {
            let value: Value = serde_json::from_str(&fs::read_to_string(path)?)
                .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
            object_keys(value.get("entry"))
        }
        SourceKind::PackageJson => object_keys(read_package_field(path)?.get("entry")),
    };
    Ok(names)
}

fn object_keys(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Object(map)) => map.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

/// Layering sorts keys; put entries back in declaration order. Entries that
/// only come from the environment go last.
fn restore_entry_order(config: &mut BuildConfig, declared: &[String]) {
    config.entry.sort_by_cached_key(|name, _| {
        declared
            .iter()
            .position(|d| d == name)
            .unwrap_or(declared.len())
    });
}

/// Environment overrides: `BALE_OUTPUT__PATH=build`, `BALE_DEVSERVER__PORT=3000`.
fn env_provider() -> Env {
    Env::prefixed("BALE_").split("__")
}

/// Lowercased spellings (as produced by environment keys) and their field names.
const FIELD_ALIASES: &[(&str, &str)] = &[
    ("publicpath", "publicPath"),
    ("sharedchunk", "sharedChunk"),
    ("minchunks", "minChunks"),
    ("devserver", "devServer"),
    ("contentbase", "contentBase"),
    ("historyapifallback", "historyApiFallback"),
    ("debouncems", "debounceMs"),
];

/// Fold lowercased keys into their camelCase fields. The lowercased value wins.
fn normalize_keys(value: &mut Value) {
    let Value::Object(map) = value else {
        return;
    };

    for (lower, camel) in FIELD_ALIASES {
        if let Some(over) = map.remove(*lower) {
            match map.get_mut(*camel) {
                Some(base) => merge_values(base, over),
                None => {
                    map.insert((*camel).to_string(), over);
                }
            }
        }
    }

    for (key, child) in map.iter_mut() {
        // Entry names are user data.
        if key != "entry" {
            normalize_keys(child);
        }
    }
}

fn merge_values(base: &mut Value, over: Value) {
    match (base, over) {
        (Value::Object(base), Value::Object(over)) => {
            for (key, value) in over {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, over) => *base = over,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn find_returns_none_when_no_config() {
        let dir = TempDir::new().unwrap();
        let discovery = ConfigDiscovery::new(dir.path());
        assert!(discovery.find().is_none());
    }

    #[test]
    fn find_prefers_toml_over_json() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bale.toml"), "").unwrap();
        fs::write(dir.path().join("bale.config.json"), "{}").unwrap();

        let discovery = ConfigDiscovery::new(dir.path());
        assert_eq!(discovery.find().unwrap(), dir.path().join("bale.toml"));
    }

    #[test]
    fn find_ignores_package_json_without_field() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), r#"{ "name": "app" }"#).unwrap();
        assert!(ConfigDiscovery::new(dir.path()).find().is_none());
    }

    #[test]
    fn load_returns_not_found_when_no_config() {
        let dir = TempDir::new().unwrap();
        let result = ConfigDiscovery::new(dir.path()).load();
        assert!(matches!(result.unwrap_err(), ConfigError::NotFound));
    }

    #[test]
    fn load_config_rejects_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bale.yaml");
        fs::write(&path, "entry: {}").unwrap();
        assert!(matches!(
            load_config(&path).unwrap_err(),
            ConfigError::UnsupportedFormat(ext) if ext == "yaml"
        ));
    }

    #[test]
    fn load_config_reports_missing_file() {
        let result = load_config(Path::new("/no/such/bale.toml"));
        assert!(matches!(result.unwrap_err(), ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn restore_entry_order_follows_declaration() {
        let mut config = BuildConfig::default();
        for name in ["admin", "bundle", "extra", "vendor"] {
            config.entry.insert(name.to_string(), vec![format!("./{name}.js")]);
        }
        let declared = vec!["vendor".to_string(), "bundle".to_string(), "admin".to_string()];
        restore_entry_order(&mut config, &declared);

        let names: Vec<_> = config.entry.keys().map(String::as_str).collect();
        assert_eq!(names, ["vendor", "bundle", "admin", "extra"]);
    }

    #[test]
    fn normalize_keys_folds_lowercase_fields() {
        let mut value = serde_json::json!({
            "entry": { "devserver": ["./a.js"] },
            "devServer": { "port": 8080, "host": "0.0.0.0" },
            "devserver": { "port": 3000 },
            "output": { "publicpath": "/static/" }
        });
        normalize_keys(&mut value);

        assert_eq!(value["devServer"]["port"], 3000);
        assert_eq!(value["devServer"]["host"], "0.0.0.0");
        assert!(value.get("devserver").is_none());
        assert_eq!(value["output"]["publicPath"], "/static/");
        assert!(value["entry"].get("devserver").is_some());
    }
}
