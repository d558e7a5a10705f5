//! Built-in plugins and the hook lifecycle.

mod helpers;

use std::sync::Arc;

use bale_bundler::{
    Assets, BuildContext, BuildResult, Bundler, Error, ErrorKind, ModuleGraph, Plugin,
};
use helpers::{assert_contains, build, config, project, read_output};
use parking_lot::Mutex;
use serde_json::json;

const TWO_ENTRIES: &[(&str, &str)] = &[
    ("src/util.js", "export const twice = (n) => n * 2;\n"),
    ("src/a.js", "import { twice } from './util';\nconsole.log(twice(1));\n"),
    ("src/b.js", "import { twice } from './util';\nconsole.log(twice(2));\n"),
    (
        "public/index.html",
        "<!DOCTYPE html>\n<html>\n<body>\n  <div id=\"app\"></div>\n</body>\n</html>\n",
    ),
];

#[test]
fn html_plugin_loads_shared_chunk_first() {
    let project = project(TWO_ENTRIES);

    let result = build(
        project.path(),
        json!({
            "entry": { "a": ["./src/a.js"], "b": ["./src/b.js"] },
            "output": { "path": "dist", "publicPath": "/static/" },
            "plugins": [{ "name": "html", "template": "public/index.html" }]
        }),
    );

    let html = &read_output(&result.output_dir)["index.html"];
    assert_eq!(
        html,
        "<!DOCTYPE html>\n<html>\n<body>\n  <div id=\"app\"></div>\n\
         <script src=\"/static/vendor.js\"></script>\n\
         <script src=\"/static/a.js\"></script>\n\
         <script src=\"/static/b.js\"></script>\n\
         </body>\n</html>\n"
    );
}

#[test]
fn html_plugin_accepts_legacy_name() {
    let project = project(&[("index.js", "console.log(1);\n")]);

    let result = build(
        project.path(),
        json!({
            "entry": { "main": ["./index.js"] },
            "output": { "path": "dist" },
            "plugins": [{ "name": "html-webpack-plugin", "title": "Demo" }]
        }),
    );

    let html = &read_output(&result.output_dir)["index.html"];
    assert_contains(html, "<title>Demo</title>");
    assert_contains(html, "<script src=\"/main.js\"></script>");
}

#[test]
fn manifest_maps_chunks_to_hashed_files() {
    let project = project(TWO_ENTRIES);

    let result = build(
        project.path(),
        json!({
            "entry": { "a": ["./src/a.js"], "b": ["./src/b.js"] },
            "output": { "path": "dist", "filename": "[name].[contenthash:6].js" },
            "plugins": [{ "name": "manifest" }]
        }),
    );

    let files = read_output(&result.output_dir);
    let manifest: serde_json::Value = serde_json::from_str(&files["manifest.json"]).unwrap();
    let entries = manifest.as_object().unwrap();
    let names: Vec<&str> = entries.keys().map(String::as_str).collect();
    assert_eq!(names, ["vendor", "a", "b"]);
    for (name, file) in entries {
        let file = file.as_str().unwrap();
        assert!(file.starts_with(&format!("{name}.")));
        assert!(files.contains_key(file), "{file} was not written");
    }
}

#[test]
fn banner_prefixes_scripts_and_shifts_source_maps() {
    let project = project(&[("index.js", "console.log(1);\n")]);

    let result = build(
        project.path(),
        json!({
            "entry": { "main": ["./index.js"] },
            "output": { "path": "dist" },
            "devtool": "source-map",
            "plugins": [
                { "name": "banner", "banner": "(c) bale" },
                { "name": "html" }
            ]
        }),
    );

    let files = read_output(&result.output_dir);
    assert!(files["main.js"].starts_with("/*! (c) bale */\n"));
    // Plugins run in order, so the page generated afterwards has no banner.
    assert!(!files["index.html"].contains("(c) bale"));

    let map: serde_json::Value = serde_json::from_str(&files["main.js.map"]).unwrap();
    assert!(map["mappings"].as_str().unwrap().starts_with(';'));
}

#[test]
fn named_modules_use_relative_paths() {
    let project = project(&[
        ("src/a.js", "import b from './b';\nconsole.log(b);\n"),
        ("src/b.js", "export default 2;\n"),
    ]);

    let result = build(
        project.path(),
        json!({
            "entry": { "main": ["./src/a.js"] },
            "output": { "path": "dist" },
            "plugins": [{ "name": "named-modules" }]
        }),
    );

    let code = &read_output(&result.output_dir)["main.js"];
    assert_contains(code, r#"modules["./src/b.js"] = function (module, exports, require) {"#);
    assert_contains(code, r#"require("./src/b.js");"#);
    assert!(code.ends_with("__bale_require__(\"./src/a.js\");\n"));
}

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<String>>,
}

impl Plugin for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn build_start(&self, _cx: &BuildContext) -> anyhow::Result<()> {
        self.calls.lock().push("buildStart".into());
        Ok(())
    }

    fn after_resolve(&self, _cx: &BuildContext, graph: &mut ModuleGraph) -> anyhow::Result<()> {
        self.calls.lock().push(format!("afterResolve:{}", graph.len()));
        Ok(())
    }

    fn before_emit(&self, _cx: &BuildContext, assets: &mut Assets) -> anyhow::Result<()> {
        self.calls.lock().push(format!("beforeEmit:{}", assets.filenames().collect::<Vec<_>>().join(",")));
        Ok(())
    }

    fn after_emit(&self, _cx: &BuildContext, result: &BuildResult) -> anyhow::Result<()> {
        self.calls.lock().push(format!("afterEmit:{}", result.emitted_files.len()));
        Ok(())
    }
}

#[test]
fn hooks_run_in_lifecycle_order() {
    let project = project(TWO_ENTRIES);
    let config = config(
        project.path(),
        json!({
            "entry": { "a": ["./src/a.js"], "b": ["./src/b.js"] },
            "output": { "path": "dist" },
            "plugins": [{ "name": "manifest" }]
        }),
    );

    let recorder = Arc::new(Recorder::default());
    Bundler::new(config)
        .unwrap()
        .with_plugin(recorder.clone())
        .build()
        .unwrap();

    assert_eq!(
        *recorder.calls.lock(),
        [
            "buildStart",
            "afterResolve:3",
            "beforeEmit:vendor.js,a.js,b.js,manifest.json",
            "afterEmit:4",
        ]
    );
}

struct Failing;

impl Plugin for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn before_emit(&self, _cx: &BuildContext, _assets: &mut Assets) -> anyhow::Result<()> {
        anyhow::bail!("refusing to emit")
    }
}

#[test]
fn plugin_errors_abort_before_writing() {
    let project = project(&[("index.js", "console.log(1);\n")]);
    let config = config(
        project.path(),
        json!({ "entry": { "main": ["./index.js"] }, "output": { "path": "dist" } }),
    );

    let err = Bundler::new(config)
        .unwrap()
        .with_plugin(Arc::new(Failing))
        .build()
        .unwrap_err();

    assert!(matches!(
        &err,
        Error::Plugin { plugin, hook: "beforeEmit", message }
            if plugin == "failing" && message.contains("refusing to emit")
    ));
    assert_eq!(err.kind(), ErrorKind::Plugin);
    assert!(!project.path().join("dist").exists());
}
