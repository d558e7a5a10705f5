//! `style` / `style-loader`: turn a stylesheet into a script that injects it.

use super::{Handler, HandlerContext, ModuleSource, SourceKind, expect_kind};

/// Wraps CSS in a script that appends a `<style>` element to `document.head`
/// and exports the CSS text.
#[derive(Debug, Default, Clone, Copy)]
pub struct StyleHandler;

impl Handler for StyleHandler {
    fn name(&self) -> &str {
        "style"
    }

    fn transform(&self, source: ModuleSource, _cx: &HandlerContext<'_>) -> anyhow::Result<ModuleSource> {
        expect_kind(&source, SourceKind::Style, self.name())?;
        let css = serde_json::to_string(&source.code)?;
        let code = format!(
            "var css = {css};\n\
             if (typeof document !== \"undefined\") {{\n\
             \x20 var style = document.createElement(\"style\");\n\
             \x20 style.textContent = css;\n\
             \x20 document.head.appendChild(style);\n\
             }}\n\
             module.exports = css;\n"
        );
        Ok(ModuleSource::script(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn wraps_css_in_injecting_script() {
        let cx = HandlerContext {
            path: Path::new("/app/a.css"),
            context: Path::new("/app"),
        };
        let out = StyleHandler
            .transform(ModuleSource::new("a { content: \"x\"; }\n", SourceKind::Style), &cx)
            .unwrap();

        assert_eq!(out.kind, SourceKind::Script);
        assert!(out.code.starts_with(r#"var css = "a { content: \"x\"; }\n";"#));
        assert!(out.code.contains("document.head.appendChild(style);"));
        assert!(out.code.ends_with("module.exports = css;\n"));
    }
}
