//! Secure, atomic writing of build output.
//!
//! # Security Features
//!
//! - **Path Validation**: asset file names may not escape the output directory
//! - **Atomic Writes**: every file is written to a temp file, then renamed
//! - **Automatic Rollback**: if any write fails, all temp files are deleted
//! - **Directory Creation**: parent directories are created as needed
//!
//! Either every asset of a build lands in the output directory or none of
//! them does, so a failed build never leaves a half-updated `dist/`.

use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;

use crate::output::Assets;
use crate::{Error, Result};

/// Write every asset under `dir`, replacing existing files.
///
/// Returns the absolute path and size in bytes of each written file, in
/// asset order.
///
/// # Examples
///
/// ```no_run
/// use bale_bundler::output::{Asset, Assets, write_assets};
/// use std::path::Path;
///
/// # fn example() -> bale_bundler::Result<()> {
/// let mut assets = Assets::new();
/// assets.insert(Asset::new("main.js", "console.log(1);"))?;
/// write_assets(&assets, Path::new("/tmp/dist"))?;
/// # Ok(())
/// # }
/// ```
pub fn write_assets(assets: &Assets, dir: &Path) -> Result<Vec<(PathBuf, u64)>> {
    let dir = validate_and_normalize_dir(dir)?;

    fs::create_dir_all(&dir).map_err(|e| {
        Error::WriteFailure(format!(
            "Failed to create output directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let mut operations = Vec::with_capacity(assets.len());
    for asset in assets {
        let target_path = validate_output_path(&dir, &asset.filename)?;
        operations.push((target_path, asset.source.as_bytes()));
    }

    write_files_atomic(&operations)?;

    Ok(operations
        .into_iter()
        .map(|(path, content)| (path, content.len() as u64))
        .collect())
}

/// Normalize the output directory and make it absolute.
fn validate_and_normalize_dir(dir: &Path) -> Result<PathBuf> {
    let cleaned = dir.clean();

    let absolute = if cleaned.is_absolute() {
        cleaned
    } else {
        std::env::current_dir()
            .map_err(|e| {
                Error::InvalidOutputPath(format!("Failed to get current directory: {}", e))
            })?
            .join(&cleaned)
            .clean()
    };

    Ok(absolute)
}

/// Join `filename` onto `base_dir`, rejecting names that would land outside it
/// (`../x`, absolute paths, NUL bytes).
pub(crate) fn validate_output_path(base_dir: &Path, filename: &str) -> Result<PathBuf> {
    if filename.is_empty() {
        return Err(Error::InvalidOutputPath("Filename is empty".to_string()));
    }

    if filename.contains('\0') {
        return Err(Error::InvalidOutputPath(
            "Filename contains null byte".to_string(),
        ));
    }

    #[cfg(target_os = "windows")]
    {
        let upper = filename.to_uppercase();
        let device_names = [
            "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
            "COM8", "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
        ];
        for device in &device_names {
            if upper == *device || upper.starts_with(&format!("{}.", device)) {
                return Err(Error::InvalidOutputPath(format!(
                    "Filename is a reserved device name: {}",
                    filename
                )));
            }
        }
    }

    let filename_path = Path::new(filename).clean();
    let full_path = base_dir.join(&filename_path).clean();

    if !full_path.starts_with(base_dir) || full_path == base_dir {
        return Err(Error::InvalidOutputPath(format!(
            "Path '{}' escapes output directory '{}' (resolved to '{}')",
            filename,
            base_dir.display(),
            full_path.display()
        )));
    }

    Ok(full_path)
}

/// Temp file next to `target`: `app.js` -> `app.js.tmp`.
fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Two-phase write: all contents go to temp files first, then every temp file
/// is renamed over its target. Temp files are removed on any failure.
fn write_files_atomic(operations: &[(PathBuf, &[u8])]) -> Result<()> {
    let mut temp_files = Vec::new();

    for (target_path, content) in operations {
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                cleanup_temp_files(&temp_files);
                Error::WriteFailure(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let temp_path = temp_path_for(target_path);
        fs::write(&temp_path, content).map_err(|e| {
            cleanup_temp_files(&temp_files);
            Error::WriteFailure(format!(
                "Failed to write temporary file '{}': {}",
                temp_path.display(),
                e
            ))
        })?;

        temp_files.push((temp_path, target_path.clone()));
    }

    for (temp_path, target_path) in &temp_files {
        fs::rename(temp_path, target_path).map_err(|e| {
            cleanup_temp_files(&temp_files);
            Error::WriteFailure(format!(
                "Failed to rename '{}' to '{}': {}",
                temp_path.display(),
                target_path.display(),
                e
            ))
        })?;
    }

    tracing::debug!(files = temp_files.len(), "wrote output files");
    Ok(())
}

/// Best-effort cleanup; we are already failing.
fn cleanup_temp_files(temp_files: &[(PathBuf, PathBuf)]) {
    for (temp_path, _) in temp_files {
        if temp_path.exists() {
            if let Err(e) = fs::remove_file(temp_path) {
                tracing::warn!(
                    "Failed to clean up temporary file '{}': {}",
                    temp_path.display(),
                    e
                );
            }
        }
    }
}
