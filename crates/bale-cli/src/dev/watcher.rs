//! File system watcher with debouncing for watch mode.
//!
//! Watches the build context recursively and filters out the output
//! directory, installed packages and hidden files so rebuilds do not trigger
//! themselves.

use crate::error::{CliError, Result};
use bale_config::BuildConfig;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// File change event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    /// Get the path affected by this change.
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// File watcher with debouncing and filtering.
///
/// Sends change events through a channel; repeated events for the same file
/// inside the debounce window are dropped.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Create a new file watcher.
    ///
    /// `ignore_patterns` are either directory paths relative to `root`
    /// (`node_modules`, `dist`) or extension patterns (`*.log`).
    ///
    /// # Errors
    ///
    /// Returns error if watcher cannot be created or directory doesn't exist
    pub fn new(
        root: PathBuf,
        ignore_patterns: Vec<String>,
        debounce_ms: u64,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !root.exists() {
            return Err(CliError::FileNotFound(root));
        }

        let (tx, rx) = mpsc::channel(100);

        let debounce_duration = Duration::from_millis(debounce_ms);
        let mut last_event: Option<(PathBuf, Instant)> = None;
        let root_clone = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else {
                return;
            };
            for path in &event.paths {
                if Self::should_ignore(path, &root_clone, &ignore_patterns) {
                    continue;
                }

                let now = Instant::now();
                if let Some((last_path, last_time)) = &last_event {
                    if last_path == path && now.duration_since(*last_time) < debounce_duration {
                        continue;
                    }
                }
                last_event = Some((path.clone(), now));

                let change = match event.kind {
                    notify::EventKind::Create(_) => FileChange::Created(path.clone()),
                    notify::EventKind::Modify(_) => FileChange::Modified(path.clone()),
                    notify::EventKind::Remove(_) => FileChange::Removed(path.clone()),
                    _ => continue,
                };

                // Receiver gone means the watch loop ended.
                let _ = tx.blocking_send(change);
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    /// Watch the build context, ignoring the output directory and packages.
    pub fn for_config(config: &BuildConfig) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        let root = config.context.clone();
        Self::new(
            root.clone(),
            ignore_patterns(config, &root),
            config.dev_server.debounce_ms,
        )
    }

    fn should_ignore(path: &Path, root: &Path, ignore_patterns: &[String]) -> bool {
        let Ok(rel_path) = path.strip_prefix(root) else {
            return true;
        };

        let path_str = rel_path.to_string_lossy();
        for pattern in ignore_patterns {
            if let Some(ext) = pattern.strip_prefix('*') {
                if path_str.ends_with(ext) {
                    return true;
                }
            } else if rel_path.starts_with(pattern)
                || rel_path.components().any(|c| c.as_os_str() == pattern.as_str())
            {
                return true;
            }
        }

        rel_path.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
        })
    }

    /// Get the root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn ignore_patterns(config: &BuildConfig, root: &Path) -> Vec<String> {
    let mut patterns = vec!["node_modules".to_string()];
    for dir in [&config.output.path, &config.content_base().to_path_buf()] {
        if let Ok(rel) = dir.strip_prefix(root) {
            if !rel.as_os_str().is_empty() {
                patterns.push(rel.to_string_lossy().into_owned());
            }
        }
    }
    patterns.dedup();
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_ignore_node_modules() {
        let root = PathBuf::from("/project");
        let patterns = vec!["node_modules".to_string()];

        let path = PathBuf::from("/project/node_modules/package/index.js");
        assert!(FileWatcher::should_ignore(&path, &root, &patterns));

        let path = PathBuf::from("/project/packages/a/node_modules/x.js");
        assert!(FileWatcher::should_ignore(&path, &root, &patterns));

        let path = PathBuf::from("/project/src/index.js");
        assert!(!FileWatcher::should_ignore(&path, &root, &patterns));
    }

    #[test]
    fn test_output_dir_prefix_does_not_swallow_siblings() {
        let root = PathBuf::from("/project");
        let patterns = vec!["build/dist".to_string()];

        let path = PathBuf::from("/project/build/dist/main.js");
        assert!(FileWatcher::should_ignore(&path, &root, &patterns));

        let path = PathBuf::from("/project/build/dist-notes.md");
        assert!(!FileWatcher::should_ignore(&path, &root, &patterns));
    }

    #[test]
    fn test_should_ignore_extension() {
        let root = PathBuf::from("/project");
        let patterns = vec!["*.log".to_string()];

        assert!(FileWatcher::should_ignore(Path::new("/project/debug.log"), &root, &patterns));
        assert!(!FileWatcher::should_ignore(Path::new("/project/src/index.js"), &root, &patterns));
    }

    #[test]
    fn test_should_ignore_hidden_files() {
        let root = PathBuf::from("/project");

        assert!(FileWatcher::should_ignore(Path::new("/project/.git/config"), &root, &[]));
        assert!(FileWatcher::should_ignore(Path::new("/project/src/.hidden/file.js"), &root, &[]));
        assert!(FileWatcher::should_ignore(Path::new("/other/file.js"), &root, &[]));
    }

    #[test]
    fn test_ignore_patterns_cover_output_dir() {
        let mut config = BuildConfig::default();
        config.resolve_paths(Path::new("/project"));

        let patterns = ignore_patterns(&config, Path::new("/project"));
        assert_eq!(patterns, ["node_modules", "dist"]);
    }

    #[test]
    fn test_file_change_path() {
        let path = PathBuf::from("/project/src/index.js");
        assert_eq!(FileChange::Modified(path.clone()).path(), path.as_path());
        assert_eq!(FileChange::Removed(path.clone()).path(), path.as_path());
    }
}
