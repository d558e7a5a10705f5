//! Chunk rendering.
//!
//! A rendered chunk registers its modules on the global module table and then
//! requires its entry modules:
//!
//! ```text
//! <runtime, in the shared chunk or in every entry chunk when there is none>
//! (function (modules) {
//! /* ./src/app.js */
//! modules[0] = function (module, exports, require) {
//! ...module code...
//! };
//! })(globalThis.__bale_modules__ || (globalThis.__bale_modules__ = {}));
//! __bale_require__(0);
//! ```
//!
//! Output depends only on the graph and the configuration, never on timing.

mod source_map;

pub use source_map::{SourceMapBuilder, encode_vlq};

use bale_config::{BuildConfig, Devtool};

use crate::chunk::{Chunk, ChunkKind};
use crate::graph::{Module, ModuleGraph};
use crate::output::render_filename;

/// Module loader shared by all chunks of a build.
pub const RUNTIME: &str = r#"(function (global) {
  var modules = global.__bale_modules__ || (global.__bale_modules__ = {});
  var cache = {};
  var has = Object.prototype.hasOwnProperty;
  function require(id) {
    if (has.call(cache, id)) return cache[id].exports;
    if (!has.call(modules, id)) throw new Error("Cannot find module '" + id + "'");
    var module = (cache[id] = { id: id, exports: {} });
    modules[id].call(module.exports, module, module.exports, require);
    return module.exports;
  }
  require.define = function (exports, getters) {
    Object.defineProperty(exports, "__esModule", { value: true });
    for (var name in getters) {
      if (has.call(getters, name) && !has.call(exports, name)) {
        Object.defineProperty(exports, name, { enumerable: true, get: getters[name] });
      }
    }
  };
  require.interop = function (mod) {
    return mod && mod.__esModule ? mod["default"] : mod;
  };
  require.star = function (exports, mod) {
    Object.keys(mod).forEach(function (name) {
      if (name !== "default" && name !== "__esModule" && !has.call(exports, name)) {
        Object.defineProperty(exports, name, { enumerable: true, get: function () { return mod[name]; } });
      }
    });
  };
  global.__bale_require__ = require;
})(globalThis);
"#;

const MODULES_OPEN: &str = "(function (modules) {\n";
const MODULES_CLOSE: &str =
    "})(globalThis.__bale_modules__ || (globalThis.__bale_modules__ = {}));\n";

/// A chunk turned into code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedChunk {
    pub name: String,
    pub kind: ChunkKind,
    pub filename: String,
    pub code: String,
    /// Source map JSON, written to `<filename>.map`.
    pub map: Option<String>,
}

impl RenderedChunk {
    pub fn map_filename(&self) -> String {
        format!("{}.map", self.filename)
    }
}

/// Output text that knows its current line.
#[derive(Default)]
struct CodeBuffer {
    code: String,
    line: usize,
}

impl CodeBuffer {
    fn push(&mut self, text: &str) {
        self.line += text.matches('\n').count();
        self.code.push_str(text);
    }
}

pub fn render_chunk(chunk: &Chunk, graph: &ModuleGraph, config: &BuildConfig) -> RenderedChunk {
    let mut out = CodeBuffer::default();
    let mut map = SourceMapBuilder::new();

    if chunk.has_runtime {
        out.push(RUNTIME);
    }

    let mut modules: Vec<&Module> = chunk.modules.iter().map(|&i| graph.module(i)).collect();
    modules.sort_by(|a, b| a.id.cmp(&b.id));

    if !modules.is_empty() {
        out.push(MODULES_OPEN);
        for module in modules {
            out.push(&format!("/* {} */\n", module.name.replace("*/", "*\\/")));
            out.push(&format!(
                "modules[{}] = function (module, exports, require) {{\n",
                module.id.to_js()
            ));

            let start = out.line;
            let code = link_module(module, graph);
            out.push(&code);
            if !code.ends_with('\n') {
                out.push("\n");
            }

            if !module.failed {
                let source = map.add_source(module.name.clone(), module.source.clone());
                let source_lines = module.source.lines().count().max(1);
                for line in 0..code.lines().count().min(source_lines) {
                    map.map_line(start + line, source, line);
                }
            }
            out.push("};\n");
        }
        out.push(MODULES_CLOSE);
    }

    for &entry in &chunk.bootstrap {
        out.push(&format!(
            "__bale_require__({});\n",
            graph.module(entry).id.to_js()
        ));
    }

    let mut code = out.code;
    let filename = render_filename(&chunk.filename, &chunk.name, &code);

    let map = match config.devtool {
        Devtool::SourceMap => {
            let basename = filename.rsplit('/').next().unwrap_or(&filename);
            code.push_str(&format!("//# sourceMappingURL={basename}.map\n"));
            Some(map.to_json(basename))
        }
        Devtool::None => None,
    };

    RenderedChunk {
        name: chunk.name.clone(),
        kind: chunk.kind,
        filename,
        code,
        map,
    }
}

/// Module code with each `require("specifier")` pointed at the target's id.
fn link_module(module: &Module, graph: &ModuleGraph) -> String {
    let mut code = String::with_capacity(module.code.len());
    let mut cursor = 0;
    for dep in &module.dependencies {
        let Some(target) = graph.index_of(&dep.resolved) else {
            continue;
        };
        code.push_str(&module.code[cursor..dep.literal.start]);
        code.push_str(&graph.module(target).id.to_js());
        cursor = dep.literal.end;
    }
    code.push_str(&module.code[cursor..]);
    code
}
