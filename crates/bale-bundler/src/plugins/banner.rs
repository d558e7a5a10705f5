//! `banner`: prepend a comment to matching assets.

use std::sync::LazyLock;

use bale_config::BannerOptions;
use regex::Regex;

use super::Plugin;
use crate::bundler::BuildContext;
use crate::output::Assets;

static DEFAULT_TEST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(js|css)$").expect("default banner pattern is valid"));

#[derive(Debug, Clone)]
pub struct BannerPlugin {
    comment: String,
    test: Regex,
}

impl BannerPlugin {
    pub fn new(options: &BannerOptions) -> Result<Self, regex::Error> {
        let test = match &options.test {
            Some(pattern) => Regex::new(pattern)?,
            None => DEFAULT_TEST.clone(),
        };
        Ok(Self {
            comment: format!("/*! {} */\n", options.banner.replace("*/", "* /")),
            test,
        })
    }
}

impl Plugin for BannerPlugin {
    fn name(&self) -> &str {
        "banner"
    }

    fn before_emit(&self, _cx: &BuildContext, assets: &mut Assets) -> anyhow::Result<()> {
        let mut shifted = Vec::new();
        for asset in assets.iter_mut() {
            if self.test.is_match(&asset.filename) {
                asset.source.insert_str(0, &self.comment);
                shifted.push(format!("{}.map", asset.filename));
            }
        }

        // The banner adds one line; keep source maps aligned.
        for map_file in shifted {
            let Some(map) = assets.get_mut(&map_file) else {
                continue;
            };
            let mut json: serde_json::Value = serde_json::from_str(&map.source)?;
            let mappings = json
                .get("mappings")
                .and_then(|m| m.as_str())
                .map(str::to_string);
            if let Some(mappings) = mappings {
                json["mappings"] = format!(";{mappings}").into();
                map.source = serde_json::to_string(&json)?;
            }
        }
        Ok(())
    }
}
