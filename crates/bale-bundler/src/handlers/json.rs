//! `json` / `json-loader`: expose a JSON document as a module.

use anyhow::Context;

use super::{Handler, HandlerContext, ModuleSource, SourceKind, expect_kind};

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonHandler;

impl Handler for JsonHandler {
    fn name(&self) -> &str {
        "json"
    }

    fn transform(&self, source: ModuleSource, _cx: &HandlerContext<'_>) -> anyhow::Result<ModuleSource> {
        expect_kind(&source, SourceKind::Json, self.name())?;
        let value: serde_json::Value =
            serde_json::from_str(&source.code).context("invalid JSON")?;
        Ok(ModuleSource::script(format!("module.exports = {value};\n")))
    }
}
