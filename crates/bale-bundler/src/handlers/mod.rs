//! Transform handlers.
//!
//! A handler turns one representation of a module into another. Rules list
//! handler ids in their `use` array; the chain runs last to first, so
//! `["style", "css", "sass"]` compiles SCSS, normalises the CSS, then wraps it
//! in a script. Every chain must end in a script, which is then lowered to the
//! bundle's module format.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;

pub mod css;
pub mod esm;
pub mod json;
pub mod raw;
pub mod sass;
pub mod style;

pub use css::CssHandler;
pub use esm::EsmHandler;
pub use json::JsonHandler;
pub use raw::RawHandler;
pub use sass::SassHandler;
pub use style::StyleHandler;

/// What a module's code currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Script,
    Style,
    Json,
    Text,
}

impl SourceKind {
    /// Initial kind, by file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("js" | "mjs" | "cjs" | "jsx") => SourceKind::Script,
            Some("css" | "scss" | "sass") => SourceKind::Style,
            Some("json") => SourceKind::Json,
            _ => SourceKind::Text,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Script => "script",
            SourceKind::Style => "stylesheet",
            SourceKind::Json => "JSON",
            SourceKind::Text => "text",
        })
    }
}

/// Module code flowing through a handler chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSource {
    pub code: String,
    pub kind: SourceKind,
}

impl ModuleSource {
    pub fn new(code: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            code: code.into(),
            kind,
        }
    }

    pub fn script(code: impl Into<String>) -> Self {
        Self::new(code, SourceKind::Script)
    }
}

/// Per-module information available to handlers.
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    /// Absolute module path.
    pub path: &'a Path,
    /// Context root of the build.
    pub context: &'a Path,
}

/// A single transform step.
///
/// Handlers run on rayon workers, so they must be `Send + Sync` and must not
/// depend on the order in which modules are transformed.
pub trait Handler: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    fn transform(&self, source: ModuleSource, cx: &HandlerContext<'_>) -> anyhow::Result<ModuleSource>;
}

/// Handler ids available to rules.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: FxHashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in handler under its short and `-loader` ids.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register_aliases(&["babel", "babel-loader", "js"], Arc::new(EsmHandler));
        registry.register_aliases(&["sass", "sass-loader", "scss"], Arc::new(SassHandler));
        registry.register_aliases(&["css", "css-loader"], Arc::new(CssHandler::default()));
        registry.register_aliases(&["style", "style-loader"], Arc::new(StyleHandler));
        registry.register_aliases(&["json", "json-loader"], Arc::new(JsonHandler));
        registry.register_aliases(&["raw", "raw-loader"], Arc::new(RawHandler));
        registry
    }

    /// Register (or replace) a handler.
    pub fn register(&mut self, id: impl Into<String>, handler: Arc<dyn Handler>) {
        self.handlers.insert(id.into(), handler);
    }

    fn register_aliases(&mut self, ids: &[&str], handler: Arc<dyn Handler>) {
        for id in ids {
            self.register(*id, Arc::clone(&handler));
        }
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Handler>> {
        self.handlers.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handlers.contains_key(id)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.handlers.keys().collect();
        ids.sort();
        f.debug_struct("HandlerRegistry").field("ids", &ids).finish()
    }
}

/// Ensure a handler received the representation it understands.
pub(crate) fn expect_kind(source: &ModuleSource, expected: SourceKind, handler: &str) -> anyhow::Result<()> {
    if source.kind == expected {
        Ok(())
    } else {
        anyhow::bail!(
            "{handler} expects {expected} input but received {}; check the order of the rule's `use` list",
            source.kind
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_knows_loader_aliases() {
        let registry = HandlerRegistry::builtin();
        for id in [
            "babel",
            "babel-loader",
            "sass-loader",
            "css-loader",
            "style-loader",
            "json",
            "raw-loader",
        ] {
            assert!(registry.contains(id), "missing {id}");
        }
        assert!(!registry.contains("ts-loader"));
        assert_eq!(registry.get("style-loader").unwrap().name(), "style");
    }

    #[test]
    fn source_kind_from_extension() {
        assert_eq!(SourceKind::from_path(Path::new("a.mjs")), SourceKind::Script);
        assert_eq!(SourceKind::from_path(Path::new("a.scss")), SourceKind::Style);
        assert_eq!(SourceKind::from_path(Path::new("a.json")), SourceKind::Json);
        assert_eq!(SourceKind::from_path(Path::new("README")), SourceKind::Text);
    }
}
