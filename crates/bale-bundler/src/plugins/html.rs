//! `html`: emit an HTML page that loads every chunk.
//!
//! Script tags are injected just before the last `</body>` of the template, in
//! chunk order, so the shared chunk always loads before the entries that
//! depend on it. Without a template a minimal document is generated.

use bale_config::HtmlOptions;

use super::Plugin;
use crate::bundler::BuildContext;
use crate::diagnostics::Diagnostic;
use crate::output::{Asset, Assets};
use crate::ErrorKind;

#[derive(Debug, Clone)]
pub struct HtmlPlugin {
    options: HtmlOptions,
}

impl HtmlPlugin {
    pub fn new(options: HtmlOptions) -> Self {
        Self { options }
    }

    fn script_tags(&self, cx: &BuildContext, assets: &Assets) -> String {
        assets
            .chunk_files()
            .into_iter()
            .map(|file| format!("<script src=\"{}\"></script>", escape_html(&cx.public_url(file))))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn generated_document(&self, scripts: &str) -> String {
        let title = escape_html(self.options.title.as_deref().unwrap_or("bale app"));
        let body = if scripts.is_empty() {
            String::new()
        } else {
            let indented: Vec<String> = scripts.lines().map(|l| format!("    {l}")).collect();
            format!("{}\n", indented.join("\n"))
        };
        format!(
            "<!DOCTYPE html>\n<html>\n  <head>\n    <meta charset=\"utf-8\">\n    <title>{title}</title>\n  </head>\n  <body>\n{body}  </body>\n</html>\n"
        )
    }
}

impl Plugin for HtmlPlugin {
    fn name(&self) -> &str {
        "html"
    }

    fn before_emit(&self, cx: &BuildContext, assets: &mut Assets) -> anyhow::Result<()> {
        let scripts = if self.options.inject {
            self.script_tags(cx, assets)
        } else {
            String::new()
        };

        let html = match &self.options.template {
            Some(path) => {
                let template = cx.runtime().read_to_string(path)?;
                if scripts.is_empty() {
                    template
                } else {
                    match inject_before_body_end(&template, &scripts) {
                        Some(html) => html,
                        None => {
                            cx.warn(
                                Diagnostic::warning(
                                    ErrorKind::Plugin,
                                    "template has no </body>; scripts were appended to the end",
                                )
                                .with_file(cx.relative_path(path)),
                            );
                            let mut html = template;
                            if !html.is_empty() && !html.ends_with('\n') {
                                html.push('\n');
                            }
                            html.push_str(&scripts);
                            html.push('\n');
                            html
                        }
                    }
                }
            }
            None => self.generated_document(&scripts),
        };

        assets.insert(Asset::new(self.options.filename.clone(), html))?;
        Ok(())
    }
}

/// Insert `scripts` before the last `</body>` (any case).
fn inject_before_body_end(template: &str, scripts: &str) -> Option<String> {
    let at = template.to_ascii_lowercase().rfind("</body>")?;
    let mut html = String::with_capacity(template.len() + scripts.len() + 1);
    html.push_str(&template[..at]);
    html.push_str(scripts);
    html.push('\n');
    html.push_str(&template[at..]);
    Some(html)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::BundlerRuntime;
    use bale_config::BuildConfig;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn assets() -> Assets {
        let mut assets = Assets::new();
        assets.insert(Asset::new("vendor.js", "").for_chunk("vendor")).unwrap();
        assets.insert(Asset::new("app.js", "").for_chunk("app")).unwrap();
        assets
    }

    fn cx(public_path: &str, runtime: BundlerRuntime) -> BuildContext {
        let mut config = BuildConfig::default();
        config.context = PathBuf::from("/app");
        config.output.public_path = public_path.to_string();
        BuildContext::new(Arc::new(config), Arc::new(runtime))
    }

    #[test]
    fn injects_before_last_body_close() {
        let runtime = BundlerRuntime::in_memory("/app");
        runtime.add_virtual_file(
            "/app/index.html",
            "<html><body><!-- </body> --><div id=\"root\"></div>\n</BODY></html>",
        );
        let cx = cx("/static/", runtime);
        let plugin = HtmlPlugin::new(HtmlOptions {
            template: Some(PathBuf::from("/app/index.html")),
            ..HtmlOptions::default()
        });

        let mut assets = assets();
        plugin.before_emit(&cx, &mut assets).unwrap();

        let html = &assets.get("index.html").unwrap().source;
        assert_eq!(
            html,
            "<html><body><!-- </body> --><div id=\"root\"></div>\n\
             <script src=\"/static/vendor.js\"></script>\n\
             <script src=\"/static/app.js\"></script>\n</BODY></html>"
        );
        assert!(cx.take_warnings().is_empty());
    }

    #[test]
    fn appends_and_warns_without_body() {
        let runtime = BundlerRuntime::in_memory("/app");
        runtime.add_virtual_file("/app/partial.html", "<div></div>");
        let cx = cx("", runtime);
        let plugin = HtmlPlugin::new(HtmlOptions {
            template: Some(PathBuf::from("/app/partial.html")),
            ..HtmlOptions::default()
        });

        let mut assets = assets();
        plugin.before_emit(&cx, &mut assets).unwrap();

        assert_eq!(
            assets.get("index.html").unwrap().source,
            "<div></div>\n<script src=\"vendor.js\"></script>\n<script src=\"app.js\"></script>\n"
        );
        let warnings = cx.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].file.as_deref(), Some("./partial.html"));
    }

    #[test]
    fn generates_document_with_escaped_title() {
        let cx = cx("/", BundlerRuntime::in_memory("/app"));
        let plugin = HtmlPlugin::new(HtmlOptions {
            title: Some("Tom & Jerry <3".into()),
            ..HtmlOptions::default()
        });

        let mut assets = assets();
        plugin.before_emit(&cx, &mut assets).unwrap();

        let html = &assets.get("index.html").unwrap().source;
        assert!(html.contains("<title>Tom &amp; Jerry &lt;3</title>"));
        assert!(html.contains("    <script src=\"/vendor.js\"></script>\n    <script src=\"/app.js\"></script>\n  </body>"));
    }

    #[test]
    fn missing_template_is_an_error() {
        let cx = cx("/", BundlerRuntime::in_memory("/app"));
        let plugin = HtmlPlugin::new(HtmlOptions {
            template: Some(PathBuf::from("/app/missing.html")),
            ..HtmlOptions::default()
        });
        assert!(plugin.before_emit(&cx, &mut assets()).is_err());
    }
}
