//! `css` / `css-loader`: parse and re-print a stylesheet with lightningcss.

use lightningcss::{
    printer::PrinterOptions,
    stylesheet::{MinifyOptions, ParserOptions, StyleSheet},
};

use super::{Handler, HandlerContext, ModuleSource, SourceKind, expect_kind};

/// Validates and normalises CSS.
///
/// Parse errors surface as transform errors, so a typo in a stylesheet fails
/// the module instead of shipping broken CSS.
#[derive(Debug, Clone, Default)]
pub struct CssHandler {
    /// Minify the printed stylesheet.
    pub minify: bool,
}

impl CssHandler {
    pub fn with_minify(mut self, enabled: bool) -> Self {
        self.minify = enabled;
        self
    }

    fn process_css(&self, filename: String, source: &str) -> anyhow::Result<String> {
        let mut stylesheet = StyleSheet::parse(
            source,
            ParserOptions {
                filename,
                ..Default::default()
            },
        )
        .map_err(|e| anyhow::anyhow!("Failed to parse CSS: {e}"))?;

        if self.minify {
            stylesheet
                .minify(MinifyOptions::default())
                .map_err(|e| anyhow::anyhow!("Failed to minify CSS: {e:?}"))?;
        }

        let result = stylesheet
            .to_css(PrinterOptions {
                minify: self.minify,
                ..Default::default()
            })
            .map_err(|e| anyhow::anyhow!("Failed to print CSS: {e:?}"))?;

        Ok(result.code)
    }
}

impl Handler for CssHandler {
    fn name(&self) -> &str {
        "css"
    }

    fn transform(&self, source: ModuleSource, cx: &HandlerContext<'_>) -> anyhow::Result<ModuleSource> {
        expect_kind(&source, SourceKind::Style, self.name())?;
        let code = self.process_css(cx.path.to_string_lossy().into_owned(), &source.code)?;
        Ok(ModuleSource::new(code, SourceKind::Style))
    }
}
