//! CLI integration tests against the real `bale` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[allow(deprecated)]
fn bale_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bale").unwrap();
    cmd.current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("BALE_BAIL")
        .env_remove("BALE_OUTPUT__PATH");
    cmd
}

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, content) in files {
        let path = dir.path().join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

const BUNDLE_CONFIG: &str = r#"
[entry]
bundle = ["./a.js"]

[output]
path = "dist"
"#;

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    bale_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn test_build_succeeds_and_writes_bundle() {
    let dir = project(&[
        ("bale.toml", BUNDLE_CONFIG),
        ("a.js", "import b from './b.js';\nconsole.log(b);\n"),
        ("b.js", "export default 'b';\n"),
    ]);

    bale_cmd(dir.path())
        .arg("build")
        .assert()
        .success()
        .stderr(predicate::str::contains("bundle.js"))
        .stderr(predicate::str::contains("Build completed"));

    let names: Vec<String> = fs::read_dir(dir.path().join("dist"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["bundle.js"]);
}

#[test]
fn test_build_with_explicit_config_path() {
    let dir = project(&[
        ("web/bale.config.json", r#"{ "entry": { "app": ["./src/index.js"] }, "output": { "path": "out" } }"#),
        ("web/src/index.js", "console.log('hi');\n"),
    ]);

    bale_cmd(dir.path())
        .args(["build", "--config", "web/bale.config.json"])
        .assert()
        .success();

    assert!(dir.path().join("web/out/app.js").is_file());
}

#[test]
fn test_missing_config_fails() {
    let dir = TempDir::new().unwrap();

    bale_cmd(dir.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config not found"));
}

#[test]
fn test_zero_entries_fails_before_writing() {
    let dir = project(&[("bale.toml", "[output]\npath = \"dist\"\n")]);

    bale_cmd(dir.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no entry points specified"));

    assert!(!dir.path().join("dist").exists());
}

#[test]
fn test_missing_import_fails_without_output() {
    let dir = project(&[
        ("bale.toml", BUNDLE_CONFIG),
        ("a.js", "import './missing.js';\n"),
    ]);

    bale_cmd(dir.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot resolve './missing.js'"))
        .stderr(predicate::str::contains("RESOLUTION_ERROR"));

    assert!(!dir.path().join("dist").exists());
}

#[test]
fn test_transform_error_without_bail_still_writes_and_fails() {
    let dir = project(&[
        (
            "bale.toml",
            r#"
[entry]
app = ["./index.js"]

[output]
path = "dist"

[[rules]]
test = "\\.scss$"
use = ["style", "css", "sass"]
"#,
        ),
        ("index.js", "import './theme.scss';\n"),
        ("theme.scss", ".btn { color: $brand; }\n"),
    ]);

    bale_cmd(dir.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("TRANSFORM_ERROR"))
        .stderr(predicate::str::contains("build finished with 1 error(s)"));

    assert!(dir.path().join("dist/app.js").is_file());
}

#[test]
fn test_unknown_handler_is_a_config_error() {
    let dir = project(&[
        (
            "bale.toml",
            r#"
[entry]
app = ["./index.js"]

[[rules]]
test = "\\.ts$"
use = ["ts-loader"]
"#,
        ),
        ("index.js", ""),
    ]);

    bale_cmd(dir.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown handler 'ts-loader'"));
}

#[test]
fn test_serve_rejects_bad_port() {
    let dir = project(&[("bale.toml", BUNDLE_CONFIG), ("a.js", "")]);

    bale_cmd(dir.path())
        .args(["serve", "--port", "not-a-port"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
