//! Module specifier resolution.
//!
//! Relative and absolute specifiers resolve against the importing file's
//! directory (entries resolve against the build context). A specifier that
//! names no file is retried with each `resolve.extensions` suffix, then as a
//! directory: its `package.json` entry field, then `index` plus each
//! extension. Bare specifiers are looked up in `resolve.modules` directories,
//! walking up from the importer.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bale_config::ResolveConfig;
use parking_lot::RwLock;
use path_clean::PathClean;
use rustc_hash::FxHashMap;

use crate::runtime::Runtime;
use crate::{Error, Result};

/// `package.json` fields consulted for a package's entry file, in order.
const MAIN_FIELDS: &[&str] = &["browser", "module", "main"];

#[derive(Debug)]
pub struct Resolver {
    context: PathBuf,
    extensions: Vec<String>,
    modules: Vec<String>,
    runtime: Arc<dyn Runtime>,
    package_entry_cache: RwLock<FxHashMap<PathBuf, Option<String>>>,
}

impl Resolver {
    pub fn new(config: &ResolveConfig, context: impl Into<PathBuf>, runtime: Arc<dyn Runtime>) -> Self {
        Self {
            context: context.into(),
            extensions: config.extensions.clone(),
            modules: config.modules.clone(),
            runtime,
            package_entry_cache: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn context(&self) -> &Path {
        &self.context
    }

    /// Resolve `specifier` as imported from `importer` (`None` for entries).
    pub fn resolve(&self, importer: Option<&Path>, specifier: &str) -> Result<PathBuf> {
        let not_found = || Error::Resolution {
            specifier: specifier.to_string(),
            importer: importer.map(Path::to_path_buf),
        };

        if specifier.is_empty() {
            return Err(not_found());
        }

        let dir = importer
            .and_then(Path::parent)
            .filter(|dir| dir.components().next().is_some())
            .unwrap_or(self.context.as_path());

        let resolved = if is_path_like(specifier) {
            self.resolve_path(&dir.join(specifier).clean())
        } else {
            let found = self.resolve_bare(dir, specifier);
            // `{ main: ["src/index.js"] }` means `<context>/src/index.js`.
            if found.is_none() && importer.is_none() {
                self.resolve_path(&self.context.join(specifier).clean())
            } else {
                found
            }
        };

        resolved.ok_or_else(not_found)
    }

    fn resolve_bare(&self, dir: &Path, specifier: &str) -> Option<PathBuf> {
        let (package, subpath) = split_package(specifier);

        let mut roots = Vec::new();
        for module_dir in &self.modules {
            let module_dir = Path::new(module_dir);
            if module_dir.is_absolute() {
                roots.push(module_dir.to_path_buf());
            } else {
                roots.extend(dir.ancestors().map(|ancestor| ancestor.join(module_dir)));
            }
        }

        roots.into_iter().find_map(|root| {
            let package_dir = root.join(package);
            match subpath {
                Some(subpath) => self.resolve_path(&package_dir.join(subpath)),
                None => self.resolve_path(&package_dir),
            }
        })
    }

    /// File, file plus extension, then directory.
    fn resolve_path(&self, path: &Path) -> Option<PathBuf> {
        self.resolve_file(path).or_else(|| self.resolve_directory(path))
    }

    fn resolve_file(&self, path: &Path) -> Option<PathBuf> {
        if self.runtime.is_file(path) {
            return Some(path.to_path_buf());
        }
        self.extensions
            .iter()
            .map(|ext| with_suffix(path, ext))
            .find(|candidate| self.runtime.is_file(candidate))
    }

    fn resolve_directory(&self, dir: &Path) -> Option<PathBuf> {
        if !self.runtime.is_dir(dir) {
            return None;
        }

        if let Some(entry) = self.package_entry(dir) {
            let target = dir.join(entry).clean();
            let found = self
                .resolve_file(&target)
                .or_else(|| self.resolve_index(&target));
            if found.is_some() {
                return found;
            }
        }

        self.resolve_index(dir)
    }

    fn resolve_index(&self, dir: &Path) -> Option<PathBuf> {
        self.extensions
            .iter()
            .map(|ext| dir.join(format!("index{ext}")))
            .find(|candidate| self.runtime.is_file(candidate))
    }

    fn package_entry(&self, dir: &Path) -> Option<String> {
        if let Some(cached) = self.package_entry_cache.read().get(dir) {
            return cached.clone();
        }

        let entry = self.read_package_entry(dir);
        self.package_entry_cache
            .write()
            .insert(dir.to_path_buf(), entry.clone());
        entry
    }

    fn read_package_entry(&self, dir: &Path) -> Option<String> {
        let manifest = dir.join("package.json");
        if !self.runtime.is_file(&manifest) {
            return None;
        }

        let source = self.runtime.read_to_string(&manifest).ok()?;
        let json: serde_json::Value = match serde_json::from_str(&source) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("ignoring malformed {}: {e}", manifest.display());
                return None;
            }
        };

        MAIN_FIELDS
            .iter()
            .find_map(|field| json.get(*field).and_then(|v| v.as_str()))
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
    }
}

fn is_path_like(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || Path::new(specifier).is_absolute()
}

/// `@scope/pkg/sub/path` -> (`@scope/pkg`, `Some("sub/path")`)
fn split_package(specifier: &str) -> (&str, Option<&str>) {
    let mut slashes = specifier.match_indices('/').map(|(i, _)| i);
    let split = if specifier.starts_with('@') {
        slashes.nth(1)
    } else {
        slashes.next()
    };
    match split {
        Some(i) => (&specifier[..i], Some(&specifier[i + 1..])),
        None => (specifier, None),
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
