//! Module graph construction.
//!
//! The graph is discovered breadth-first. Each wave of newly discovered files
//! is loaded, transformed and scanned in parallel on the rayon pool; results
//! are then merged in the wave's own order, so worker scheduling never leaks
//! into the graph. Once discovery finishes, modules are sorted by path and
//! numbered, which makes ids identical across runs.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::diagnostics::Diagnostic;
use crate::handlers::{Handler, HandlerContext, JsonHandler, ModuleSource, SourceKind, esm};
use crate::resolver::Resolver;
use crate::rules::RuleSet;
use crate::runtime::{Runtime, RuntimeError};
use crate::scan::find_requires;
use crate::{Error, Result};

/// Identifier a module is registered under in the emitted bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum ModuleId {
    Index(usize),
    /// Human-readable id, e.g. `./src/app.js`.
    Named(String),
}

impl ModuleId {
    /// The id as a JavaScript literal.
    pub fn to_js(&self) -> String {
        match self {
            ModuleId::Index(index) => index.to_string(),
            ModuleId::Named(name) => {
                serde_json::to_string(name).unwrap_or_else(|_| format!("\"{name}\""))
            }
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleId::Index(index) => write!(f, "{index}"),
            ModuleId::Named(name) => f.write_str(name),
        }
    }
}

/// A `require` call in a module's transformed code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub specifier: String,
    /// Byte range of the specifier literal (quotes included) in `Module::code`.
    pub literal: Range<usize>,
    pub resolved: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Module {
    pub id: ModuleId,
    /// Absolute path.
    pub path: PathBuf,
    /// Path relative to the context, `./`-prefixed with forward slashes.
    pub name: String,
    /// Original file contents.
    pub source: String,
    /// Transformed script.
    pub code: String,
    pub dependencies: Vec<Dependency>,
    /// The handler chain failed and `code` throws the error at runtime.
    pub failed: bool,
}

/// Every module reachable from the configured entries.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    modules: Vec<Module>,
    by_path: FxHashMap<PathBuf, usize>,
    entries: IndexMap<String, Vec<usize>>,
}

impl ModuleGraph {
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Mutable access for plugins. Paths and dependencies must not change.
    pub fn modules_mut(&mut self) -> &mut [Module] {
        &mut self.modules
    }

    pub fn module(&self, index: usize) -> &Module {
        &self.modules[index]
    }

    pub fn index_of(&self, path: &Path) -> Option<usize> {
        self.by_path.get(path).copied()
    }

    /// Entry name to the indexes of its entry modules, in declaration order.
    pub fn entries(&self) -> &IndexMap<String, Vec<usize>> {
        &self.entries
    }

    /// Module indexes a module depends on, in source order.
    pub fn dependencies_of(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.modules[index]
            .dependencies
            .iter()
            .filter_map(|dep| self.index_of(&dep.resolved))
    }

    /// Every module reachable from `roots`, roots included.
    pub fn reachable_from(&self, roots: &[usize]) -> BTreeSet<usize> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<usize> = roots.to_vec();
        while let Some(index) = stack.pop() {
            if seen.insert(index) {
                stack.extend(self.dependencies_of(index));
            }
        }
        seen
    }
}

/// Context-relative display name for a path.
pub fn relative_name(context: &Path, path: &Path) -> String {
    match path.strip_prefix(context) {
        Ok(rel) => format!("./{}", rel.to_string_lossy().replace('\\', "/")),
        Err(_) => path.to_string_lossy().replace('\\', "/"),
    }
}

/// Result of loading one file.
struct Loaded {
    module: Module,
    diagnostic: Option<Diagnostic>,
}

pub(crate) struct GraphBuilder<'a> {
    pub resolver: &'a Resolver,
    pub rules: &'a RuleSet,
    pub runtime: &'a dyn Runtime,
    pub context: &'a Path,
    pub bail: bool,
}

impl GraphBuilder<'_> {
    pub fn build(&self, entries: &IndexMap<String, Vec<String>>) -> Result<(ModuleGraph, Vec<Diagnostic>)> {
        let mut entry_paths: IndexMap<String, Vec<PathBuf>> = IndexMap::new();
        let mut seen = FxHashSet::default();
        let mut frontier = Vec::new();

        for (name, specifiers) in entries {
            let mut paths = Vec::with_capacity(specifiers.len());
            for specifier in specifiers {
                let path = self.resolver.resolve(None, specifier)?;
                if seen.insert(path.clone()) {
                    frontier.push(path.clone());
                }
                paths.push(path);
            }
            entry_paths.insert(name.clone(), paths);
        }

        let mut modules = Vec::new();
        let mut diagnostics = Vec::new();
        let mut wave = 0usize;

        while !frontier.is_empty() {
            tracing::debug!(wave, modules = frontier.len(), "loading module wave");
            let results: Vec<Result<Loaded>> = frontier.par_iter().map(|path| self.load(path)).collect();

            let mut next = Vec::new();
            for result in results {
                let loaded = result?;
                for dep in &loaded.module.dependencies {
                    if seen.insert(dep.resolved.clone()) {
                        next.push(dep.resolved.clone());
                    }
                }
                diagnostics.extend(loaded.diagnostic);
                modules.push(loaded.module);
            }
            frontier = next;
            wave += 1;
        }

        modules.sort_by(|a, b| a.path.cmp(&b.path));
        let mut by_path = FxHashMap::default();
        for (index, module) in modules.iter_mut().enumerate() {
            module.id = ModuleId::Index(index);
            by_path.insert(module.path.clone(), index);
        }

        let entries = entry_paths
            .into_iter()
            .map(|(name, paths)| {
                let mut indexes = Vec::with_capacity(paths.len());
                for path in paths {
                    if let Some(&index) = by_path.get(&path) {
                        if !indexes.contains(&index) {
                            indexes.push(index);
                        }
                    }
                }
                (name, indexes)
            })
            .collect();

        Ok((
            ModuleGraph {
                modules,
                by_path,
                entries,
            },
            diagnostics,
        ))
    }

    fn load(&self, path: &Path) -> Result<Loaded> {
        let source = self.runtime.read_to_string(path).map_err(|e| match e {
            RuntimeError::FileNotFound(_) => Error::Resolution {
                specifier: path.display().to_string(),
                importer: None,
            },
            RuntimeError::Io(message) => Error::io(
                format!("failed to read {}", path.display()),
                std::io::Error::other(message),
            ),
        })?;
        let name = relative_name(self.context, path);

        let transformed = self.transform(path, &source).and_then(|code| {
            let requires = find_requires(&code).map_err(|e| ("bale".to_string(), e))?;
            Ok((code, requires))
        });
        let (code, requires, failed, diagnostic) = match transformed {
            Ok((code, requires)) => (code, requires, false, None),
            Err((handler, err)) => {
                let error = Error::Transform {
                    path: path.to_path_buf(),
                    handler,
                    message: format!("{err:#}"),
                };
                if self.bail {
                    return Err(error);
                }
                tracing::debug!("{error}");
                let thrown = serde_json::to_string(&error.to_string()).unwrap_or_default();
                let diagnostic = Diagnostic::from(&error).with_file(name.clone());
                (format!("throw new Error({thrown});\n"), Vec::new(), true, Some(diagnostic))
            }
        };

        let dependencies = requires
            .into_iter()
            .map(|call| {
                let resolved = self.resolver.resolve(Some(path), &call.specifier)?;
                Ok(Dependency {
                    specifier: call.specifier,
                    literal: call.literal,
                    resolved,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Loaded {
            module: Module {
                id: ModuleId::Index(0),
                path: path.to_path_buf(),
                name,
                source,
                code,
                dependencies,
                failed,
            },
            diagnostic,
        })
    }

    /// Run the matching rule's handler chain, then lower module syntax.
    ///
    /// Errors carry the id of the handler that failed.
    fn transform(&self, path: &Path, source: &str) -> std::result::Result<String, (String, anyhow::Error)> {
        let cx = HandlerContext {
            path,
            context: self.context,
        };
        let mut current = ModuleSource::new(source, SourceKind::from_path(path));
        let mut last = "bale".to_string();

        match self.rules.find(path) {
            Some(rule) => {
                for (id, handler) in rule.handlers.iter().rev() {
                    current = handler.transform(current, &cx).map_err(|e| (id.clone(), e))?;
                    last.clone_from(id);
                }
            }
            None => match current.kind {
                SourceKind::Script => {}
                SourceKind::Json => {
                    current = JsonHandler.transform(current, &cx).map_err(|e| ("json".to_string(), e))?;
                }
                kind => {
                    return Err((
                        last,
                        anyhow::anyhow!("no rule matches this {kind} module; add a rule with a handler for it"),
                    ));
                }
            },
        }

        if current.kind != SourceKind::Script {
            return Err((
                last,
                anyhow::anyhow!(
                    "handler chain produced {} output; the first handler in `use` must emit a script",
                    current.kind
                ),
            ));
        }

        esm::lower(&current.code).map_err(|e| ("babel".to_string(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::HandlerRegistry;
    use crate::runtime::BundlerRuntime;
    use bale_config::{ResolveConfig, TransformRule};
    use std::sync::Arc;

    fn build(files: &[(&str, &str)], rules: &[TransformRule], bail: bool) -> Result<(ModuleGraph, Vec<Diagnostic>)> {
        let runtime = BundlerRuntime::in_memory("/app");
        for (path, code) in files {
            runtime.add_virtual_file(*path, *code);
        }
        let runtime: Arc<dyn Runtime> = Arc::new(runtime);
        let resolver = Resolver::new(&ResolveConfig::default(), "/app", Arc::clone(&runtime));
        let rules = RuleSet::compile(rules, &HandlerRegistry::builtin())?;
        let builder = GraphBuilder {
            resolver: &resolver,
            rules: &rules,
            runtime: runtime.as_ref(),
            context: Path::new("/app"),
            bail,
        };
        let mut entries = IndexMap::new();
        entries.insert("main".to_string(), vec!["./src/main.js".to_string()]);
        builder.build(&entries)
    }

    #[test]
    fn ids_follow_path_order() {
        let (graph, diagnostics) = build(
            &[
                ("/app/src/main.js", "import b from './b';\nimport a from './a';\n"),
                ("/app/src/a.js", "export default 'a';\n"),
                ("/app/src/b.js", "import a from './a';\nexport default a + 'b';\n"),
            ],
            &[],
            false,
        )
        .unwrap();

        assert!(diagnostics.is_empty());
        let names: Vec<_> = graph.modules().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["./src/a.js", "./src/b.js", "./src/main.js"]);
        assert_eq!(graph.module(2).id, ModuleId::Index(2));
        assert_eq!(graph.entries()["main"], vec![2]);
        assert_eq!(graph.reachable_from(&[1]), BTreeSet::from([0, 1]));
    }

    #[test]
    fn requires_in_template_substitutions_are_dependencies() {
        let (graph, diagnostics) = build(
            &[
                ("/app/src/main.js", "console.log(`v=${require('./b')}`);\n"),
                ("/app/src/b.js", "module.exports = 'b';\n"),
            ],
            &[],
            false,
        )
        .unwrap();

        assert!(diagnostics.is_empty());
        assert_eq!(graph.len(), 2);
        let main = graph.module(graph.index_of(Path::new("/app/src/main.js")).unwrap());
        assert_eq!(main.dependencies[0].specifier, "./b");
        assert_eq!(&main.code[main.dependencies[0].literal.clone()], "'./b'");
    }

    #[test]
    fn module_only_syntax_becomes_a_diagnostic() {
        let (graph, diagnostics) = build(
            &[("/app/src/main.js", "console.log(1);\nconsole.log(import.meta.url);\n")],
            &[],
            false,
        )
        .unwrap();

        assert!(graph.module(0).failed);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("unsupported module syntax on line 2"));
    }

    #[test]
    fn missing_import_is_fatal() {
        let err = build(&[("/app/src/main.js", "import './nope';\n")], &[], false).unwrap_err();
        assert!(matches!(err, Error::Resolution { ref specifier, .. } if specifier == "./nope"));
    }

    #[test]
    fn transform_failure_becomes_throwing_module() {
        let (graph, diagnostics) = build(
            &[
                ("/app/src/main.js", "import './style.scss';\n"),
                ("/app/src/style.scss", ".a { color: $undefined; }"),
            ],
            &[TransformRule::new(r"\.scss$", &["style", "css", "sass"])],
            false,
        )
        .unwrap();

        let style = graph.module(graph.index_of(Path::new("/app/src/style.scss")).unwrap());
        assert!(style.failed);
        assert!(style.code.starts_with("throw new Error("));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].file.as_deref(), Some("./src/style.scss"));
        assert!(diagnostics[0].message.contains("Undefined variable: $undefined"));
    }

    #[test]
    fn transform_failure_with_bail_aborts() {
        let err = build(
            &[
                ("/app/src/main.js", "import './style.scss';\n"),
                ("/app/src/style.scss", ".a { color: $undefined; }"),
            ],
            &[TransformRule::new(r"\.scss$", &["style", "css", "sass"])],
            true,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Transform { ref handler, .. } if handler == "sass"));
    }

    #[test]
    fn unmatched_stylesheet_needs_a_rule() {
        let (_, diagnostics) = build(
            &[
                ("/app/src/main.js", "require('./a.css');\n"),
                ("/app/src/a.css", ".a {}"),
            ],
            &[],
            false,
        )
        .unwrap();
        assert!(diagnostics[0].message.contains("no rule matches this stylesheet module"));
    }

    #[test]
    fn relative_names_use_forward_slashes() {
        assert_eq!(
            relative_name(Path::new("/app"), Path::new("/app/src/a.js")),
            "./src/a.js"
        );
        assert_eq!(relative_name(Path::new("/app"), Path::new("/lib/x.js")), "/lib/x.js");
    }
}
