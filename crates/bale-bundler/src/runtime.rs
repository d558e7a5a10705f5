//! File access used by the resolver and module loader
//!
//! `NativeRuntime` reads straight from disk. `BundlerRuntime` layers in-memory
//! virtual files over the filesystem: virtual files are checked first, then the
//! runtime falls back to disk. Tests and plugins use it to build from sources
//! that never touch the filesystem.

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use path_clean::PathClean;
use rustc_hash::FxHashMap;

/// Result type for runtime operations
pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Read-only filesystem view shared by every build worker.
pub trait Runtime: Send + Sync + Debug {
    fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    fn is_file(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> RuntimeResult<String> {
        let bytes = self.read_file(path)?;
        String::from_utf8(bytes)
            .map_err(|e| RuntimeError::Io(format!("{} is not valid UTF-8: {e}", path.display())))
    }
}

/// Plain filesystem access.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeRuntime;

impl Runtime for NativeRuntime {
    fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RuntimeError::FileNotFound(path.to_path_buf())
            } else {
                RuntimeError::Io(format!("Failed to read {}: {}", path.display(), e))
            }
        })
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

/// Runtime implementation that combines virtual files with filesystem access
#[derive(Debug)]
pub struct BundlerRuntime {
    /// Virtual files stored in memory
    virtual_files: Arc<RwLock<FxHashMap<PathBuf, Vec<u8>>>>,
    /// Current working directory for resolving relative paths
    cwd: PathBuf,
    /// Fall back to the filesystem for non-virtual paths
    fallback: bool,
}

impl BundlerRuntime {
    /// Create a new BundlerRuntime with the given working directory
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            virtual_files: Arc::new(RwLock::new(FxHashMap::default())),
            cwd: cwd.into(),
            fallback: true,
        }
    }

    /// A runtime that only sees virtual files.
    pub fn in_memory(cwd: impl Into<PathBuf>) -> Self {
        Self {
            fallback: false,
            ..Self::new(cwd)
        }
    }

    /// Add a virtual file to the runtime
    ///
    /// The path is normalized before storage to ensure consistent lookup.
    pub fn add_virtual_file(&self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        let path_buf: PathBuf = path.into();
        let normalized = self.normalize_for_lookup(&path_buf);
        self.virtual_files.write().insert(normalized, content.into());
    }

    /// Check if a path exists as a virtual file
    pub fn has_virtual_file(&self, path: &Path) -> bool {
        let normalized = self.normalize_for_lookup(path);
        self.virtual_files.read().contains_key(&normalized)
    }

    /// Normalize a path for virtual file lookup
    ///
    /// "/foo/bar.js" and "./bar.js" (when cwd is /foo) map to the same key.
    fn normalize_for_lookup(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.clean()
        } else {
            self.cwd.join(path).clean()
        }
    }
}

impl Runtime for BundlerRuntime {
    fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let normalized = self.normalize_for_lookup(path);
        if let Some(content) = self.virtual_files.read().get(&normalized) {
            return Ok(content.clone());
        }

        if self.fallback {
            NativeRuntime.read_file(&normalized)
        } else {
            Err(RuntimeError::FileNotFound(normalized))
        }
    }

    fn is_file(&self, path: &Path) -> bool {
        self.has_virtual_file(path) || (self.fallback && self.normalize_for_lookup(path).is_file())
    }

    fn is_dir(&self, path: &Path) -> bool {
        let normalized = self.normalize_for_lookup(path);
        let virtual_dir = self
            .virtual_files
            .read()
            .keys()
            .any(|file| file != &normalized && file.starts_with(&normalized));
        virtual_dir || (self.fallback && normalized.is_dir())
    }
}
