//! `raw` / `raw-loader`: export a file's text as a string.

use super::{Handler, HandlerContext, ModuleSource};

/// Accepts any kind of input.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawHandler;

impl Handler for RawHandler {
    fn name(&self) -> &str {
        "raw"
    }

    fn transform(&self, source: ModuleSource, _cx: &HandlerContext<'_>) -> anyhow::Result<ModuleSource> {
        let text = serde_json::to_string(&source.code)?;
        Ok(ModuleSource::script(format!("module.exports = {text};\n")))
    }
}
