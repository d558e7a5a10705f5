//! Shared test utilities for bale-bundler tests
//!
//! Projects are written to temporary directories so builds go through the
//! real filesystem, resolver and writer.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use bale_bundler::{BuildConfig, BuildResult, Bundler};
use serde_json::Value;
use tempfile::TempDir;

/// Create a project directory containing `files` (path relative to the root).
pub fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    for (path, content) in files {
        let path = dir.path().join(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, content).expect("write fixture");
    }
    dir
}

/// Parse `value` as a config rooted at `root`.
pub fn config(root: &Path, value: Value) -> BuildConfig {
    BuildConfig::from_value(value, root).expect("valid config")
}

/// Build `value` in `root` and return the result.
pub fn build(root: &Path, value: Value) -> BuildResult {
    Bundler::new(config(root, value))
        .expect("bundler")
        .build()
        .expect("build succeeds")
}

/// Every file under `dir`, keyed by forward-slash path relative to `dir`.
pub fn read_output(dir: &Path) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    collect(dir, dir, &mut files);
    files
}

fn collect(root: &Path, dir: &Path, files: &mut BTreeMap<String, String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let path = entry.expect("dir entry").path();
        if path.is_dir() {
            collect(root, &path, files);
        } else {
            let rel = path
                .strip_prefix(root)
                .expect("under root")
                .to_string_lossy()
                .replace('\\', "/");
            files.insert(rel, fs::read_to_string(&path).expect("utf-8 output"));
        }
    }
}

/// Assert that `haystack` contains `needle`, showing a preview on failure.
pub fn assert_contains(haystack: &str, needle: &str) {
    assert!(
        haystack.contains(needle),
        "Expected output to contain '{}', but it didn't.\nPreview (first 800 chars): {}",
        needle,
        haystack.chars().take(800).collect::<String>()
    );
}
