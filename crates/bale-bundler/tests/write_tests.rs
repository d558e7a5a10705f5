//! Integration tests for output writing.
//!
//! These tests verify the complete write pipeline including:
//! - Directory creation
//! - Atomic writes with rollback
//! - Overwrite behavior
//! - Security (path traversal prevention)

use std::fs;

use bale_bundler::Error;
use bale_bundler::output::{Asset, Assets, write_assets};
use tempfile::TempDir;

fn assets(files: &[(&str, &str)]) -> Assets {
    let mut assets = Assets::new();
    for (filename, content) in files {
        assets.insert(Asset::new(*filename, *content)).unwrap();
    }
    assets
}

#[test]
fn test_write_single_file() {
    let temp_dir = TempDir::new().unwrap();

    write_assets(&assets(&[("bundle.js", "console.log('hello');")]), temp_dir.path()).unwrap();

    let content = fs::read_to_string(temp_dir.path().join("bundle.js")).unwrap();
    assert_eq!(content, "console.log('hello');");
}

#[test]
fn test_write_creates_missing_output_dir() {
    let temp_dir = TempDir::new().unwrap();
    let output_dir = temp_dir.path().join("deep/nested/dist");

    let written = write_assets(&assets(&[("js/app.js", "1")]), &output_dir).unwrap();

    assert_eq!(written, vec![(output_dir.join("js/app.js"), 1)]);
    assert!(output_dir.join("js/app.js").is_file());
}

#[test]
fn test_write_overwrites_existing_files() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("bundle.js"), "old contents that are longer").unwrap();

    write_assets(&assets(&[("bundle.js", "new")]), temp_dir.path()).unwrap();

    assert_eq!(fs::read_to_string(temp_dir.path().join("bundle.js")).unwrap(), "new");
}

#[test]
fn test_write_leaves_unrelated_files_alone() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("keep.txt"), "keep").unwrap();

    write_assets(&assets(&[("bundle.js", "1")]), temp_dir.path()).unwrap();

    assert_eq!(fs::read_to_string(temp_dir.path().join("keep.txt")).unwrap(), "keep");
}

#[test]
fn test_path_traversal_is_rejected_before_any_write() {
    let temp_dir = TempDir::new().unwrap();
    let output_dir = temp_dir.path().join("dist");

    let err = write_assets(
        &assets(&[("ok.js", "1"), ("../../escape.js", "2")]),
        &output_dir,
    )
    .unwrap_err();

    assert!(matches!(err, Error::InvalidOutputPath(_)));
    assert!(!output_dir.join("ok.js").exists());
    assert!(!temp_dir.path().join("escape.js").exists());
}

#[test]
fn test_absolute_asset_names_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let err = write_assets(&assets(&[("/etc/passwd", "x")]), temp_dir.path()).unwrap_err();
    assert!(matches!(err, Error::InvalidOutputPath(_)));
}

#[test]
fn test_empty_asset_set_creates_the_directory() {
    let temp_dir = TempDir::new().unwrap();
    let output_dir = temp_dir.path().join("dist");

    let written = write_assets(&Assets::new(), &output_dir).unwrap();

    assert!(written.is_empty());
    assert!(output_dir.is_dir());
}
