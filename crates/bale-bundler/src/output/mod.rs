//! Emitted assets and writing them to disk.

pub mod naming;
pub mod writer;

use indexmap::IndexMap;
use serde::Serialize;

use crate::{Error, Result};

pub use naming::{DEFAULT_HASH_LENGTH, content_hash, render_filename};
pub use writer::write_assets;

/// One output file, addressed by its path relative to `output.path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    pub filename: String,
    pub source: String,
    /// Name of the chunk this script was rendered from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk: Option<String>,
}

impl Asset {
    pub fn new(filename: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            source: source.into(),
            chunk: None,
        }
    }

    pub fn for_chunk(mut self, chunk: impl Into<String>) -> Self {
        self.chunk = Some(chunk.into());
        self
    }
}

/// Assets in emission order: chunks first (shared chunk leading), then
/// anything plugins add.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assets {
    inner: IndexMap<String, Asset>,
}

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset. Two assets may never share a file name.
    pub fn insert(&mut self, asset: Asset) -> Result<()> {
        if self.inner.contains_key(&asset.filename) {
            return Err(Error::OutputCollision {
                filename: asset.filename,
            });
        }
        self.inner.insert(asset.filename.clone(), asset);
        Ok(())
    }

    pub fn get(&self, filename: &str) -> Option<&Asset> {
        self.inner.get(filename)
    }

    pub fn get_mut(&mut self, filename: &str) -> Option<&mut Asset> {
        self.inner.get_mut(filename)
    }

    pub fn remove(&mut self, filename: &str) -> Option<Asset> {
        self.inner.shift_remove(filename)
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.inner.contains_key(filename)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.inner.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Asset> {
        self.inner.values_mut()
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    /// Script file rendered for chunk `name`.
    pub fn chunk_file(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|asset| asset.chunk.as_deref() == Some(name))
            .map(|asset| asset.filename.as_str())
    }

    /// Script files in load order.
    pub fn chunk_files(&self) -> Vec<&str> {
        self.iter()
            .filter(|asset| asset.chunk.is_some())
            .map(|asset| asset.filename.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<'a> IntoIterator for &'a Assets {
    type Item = &'a Asset;
    type IntoIter = indexmap::map::Values<'a, String, Asset>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicate_file_names() {
        let mut assets = Assets::new();
        assets.insert(Asset::new("main.js", "1").for_chunk("main")).unwrap();
        let err = assets.insert(Asset::new("main.js", "2")).unwrap_err();
        assert!(matches!(err, Error::OutputCollision { ref filename } if filename == "main.js"));
        assert_eq!(assets.get("main.js").unwrap().source, "1");
    }

    #[test]
    fn finds_chunk_files_in_order() {
        let mut assets = Assets::new();
        assets.insert(Asset::new("vendor.js", "").for_chunk("vendor")).unwrap();
        assets.insert(Asset::new("vendor.js.map", "{}")).unwrap();
        assets.insert(Asset::new("app.js", "").for_chunk("app")).unwrap();
        assets.insert(Asset::new("index.html", "")).unwrap();

        assert_eq!(assets.chunk_files(), ["vendor.js", "app.js"]);
        assert_eq!(assets.chunk_file("app"), Some("app.js"));
        assert_eq!(assets.chunk_file("missing"), None);
        assert_eq!(assets.len(), 4);
    }
}
