//! `manifest`: emit a JSON object mapping chunk names to their file names.

use bale_config::ManifestOptions;
use indexmap::IndexMap;

use super::Plugin;
use crate::bundler::BuildContext;
use crate::output::{Asset, Assets};

#[derive(Debug, Clone)]
pub struct ManifestPlugin {
    options: ManifestOptions,
}

impl ManifestPlugin {
    pub fn new(options: ManifestOptions) -> Self {
        Self { options }
    }
}

impl Plugin for ManifestPlugin {
    fn name(&self) -> &str {
        "manifest"
    }

    fn before_emit(&self, _cx: &BuildContext, assets: &mut Assets) -> anyhow::Result<()> {
        let manifest: IndexMap<&str, &str> = assets
            .iter()
            .filter_map(|asset| Some((asset.chunk.as_deref()?, asset.filename.as_str())))
            .collect();
        let json = serde_json::to_string_pretty(&manifest)?;
        assets.insert(Asset::new(self.options.filename.clone(), json + "\n"))?;
        Ok(())
    }
}
