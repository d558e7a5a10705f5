//! Tests for config file discovery and loading
//!
//! Covers `bale.toml`, `bale.config.json`, the `bale` field of package.json,
//! and `BALE_` environment overrides.

use bale_config::{ConfigDiscovery, ConfigError, Devtool, MinChunks, PluginConfig, load_config};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

const TOML_CONFIG: &str = r#"
context = "."
devtool = "source-map"

[entry]
vendor = ["./lib/jquery.js"]
bundle = ["./src/index.js"]

[output]
path = "dist"
publicPath = "/"

[sharedChunk]
name = "vendor"
minChunks = "Infinity"

[[rules]]
test = "\\.js$"
exclude = "node_modules"
use = ["babel"]

[[rules]]
test = "\\.scss$"
use = ["style", "css", "sass"]

[[plugins]]
name = "named-modules"

[[plugins]]
name = "html"
template = "src/index.html"

[devServer]
historyApiFallback = true
host = "0.0.0.0"
"#;

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/index.html"), "<html><body></body></html>").unwrap();
    dir
}

#[test]
#[serial]
fn discovers_bale_toml() {
    let dir = project();
    fs::write(dir.path().join("bale.toml"), TOML_CONFIG).unwrap();

    let discovery = ConfigDiscovery::new(dir.path());
    let found = discovery.find().unwrap();
    assert_eq!(found.file_name().unwrap(), "bale.toml");

    let config = discovery.load().unwrap();
    let names: Vec<_> = config.entry.keys().map(String::as_str).collect();
    assert_eq!(names, ["vendor", "bundle"]);
    assert_eq!(config.devtool, Devtool::SourceMap);
    assert_eq!(config.shared_chunk.min_chunks, MinChunks::Infinity);
    assert_eq!(config.rules.len(), 2);
    assert_eq!(config.rules[1].handlers, vec!["style", "css", "sass"]);
    assert_eq!(config.plugins[0], PluginConfig::NamedModules);
    assert!(config.dev_server.history_api_fallback);
    assert_eq!(config.dev_server.host, "0.0.0.0");
}

#[test]
#[serial]
fn relative_paths_resolve_against_config_dir() {
    let dir = project();
    fs::write(dir.path().join("bale.toml"), TOML_CONFIG).unwrap();

    let config = load_config(&dir.path().join("bale.toml")).unwrap();
    assert_eq!(config.output.path, dir.path().join("dist"));
    assert_eq!(config.context, dir.path().to_path_buf());
    match &config.plugins[1] {
        PluginConfig::Html(html) => {
            assert_eq!(html.template.as_deref(), Some(dir.path().join("src/index.html").as_path()));
        }
        other => panic!("expected html plugin, got {other:?}"),
    }
}

#[test]
#[serial]
fn discovers_json_config() {
    let dir = project();
    fs::write(
        dir.path().join("bale.config.json"),
        r#"{
  "entry": { "main": ["./src/main.js"], "admin": ["./src/admin.js"] },
  "output": { "path": "build", "filename": "[name].[contenthash:8].js" }
}"#,
    )
    .unwrap();

    let config = ConfigDiscovery::new(dir.path()).load().unwrap();
    let names: Vec<_> = config.entry.keys().map(String::as_str).collect();
    assert_eq!(names, ["main", "admin"]);
    assert_eq!(config.output.filename, "[name].[contenthash:8].js");
    assert_eq!(config.output.path, dir.path().join("build"));
}

#[test]
#[serial]
fn discovers_package_json() {
    let dir = project();
    fs::write(
        dir.path().join("package.json"),
        r#"{
  "name": "test",
  "bale": {
    "entry": { "bundle": ["./src/index.js"] }
  }
}"#,
    )
    .unwrap();

    let discovery = ConfigDiscovery::new(dir.path());
    assert_eq!(discovery.find().unwrap().file_name().unwrap(), "package.json");
    let config = discovery.load().unwrap();
    assert_eq!(config.entry["bundle"], vec!["./src/index.js".to_string()]);
}

#[test]
#[serial]
fn zero_entries_is_a_config_error() {
    let dir = project();
    fs::write(dir.path().join("bale.toml"), "[output]\npath = \"dist\"\n").unwrap();

    let result = ConfigDiscovery::new(dir.path()).load();
    assert!(matches!(result.unwrap_err(), ConfigError::NoEntries));
    assert!(!dir.path().join("dist").exists());
}

#[test]
#[serial]
fn syntax_errors_surface_as_parse_errors() {
    let dir = project();
    fs::write(dir.path().join("bale.toml"), "[entry\nbundle = ").unwrap();

    let result = ConfigDiscovery::new(dir.path()).load();
    assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
}

#[test]
#[serial]
fn unknown_fields_are_rejected() {
    let dir = project();
    fs::write(
        dir.path().join("bale.toml"),
        "mode = \"production\"\n[entry]\nbundle = [\"./src/index.js\"]\n",
    )
    .unwrap();

    assert!(ConfigDiscovery::new(dir.path()).load().is_err());
}

#[test]
#[serial]
fn missing_template_fails_fs_validation() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("bale.toml"),
        "[entry]\nbundle = [\"./index.js\"]\n[[plugins]]\nname = \"html\"\ntemplate = \"missing.html\"\n",
    )
    .unwrap();

    assert!(matches!(
        ConfigDiscovery::new(dir.path()).load().unwrap_err(),
        ConfigError::TemplateNotFound { .. }
    ));
}

#[test]
#[serial]
fn environment_overrides_file_values() {
    let dir = project();
    fs::write(dir.path().join("bale.toml"), TOML_CONFIG).unwrap();

    // SAFETY: serialized with every other test touching the environment.
    unsafe {
        std::env::set_var("BALE_DEVSERVER__PORT", "3000");
        std::env::set_var("BALE_BAIL", "true");
    }
    let result = ConfigDiscovery::new(dir.path()).load();
    unsafe {
        std::env::remove_var("BALE_DEVSERVER__PORT");
        std::env::remove_var("BALE_BAIL");
    }

    let config = result.unwrap();
    assert_eq!(config.dev_server.port, 3000);
    assert_eq!(config.dev_server.host, "0.0.0.0");
    assert!(config.bail);
}
