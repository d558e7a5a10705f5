//! `sass` / `sass-loader`: compile a subset of SCSS to plain CSS.
//!
//! Supported: `$variables` (block scoped, `!default`, `!global`), `#{}`
//! interpolation, nested rules with `&` and selector lists, `//` comments, and
//! nested `@media` / `@supports` blocks, which bubble up around the rule they
//! appear in. Mixins, functions, control flow, `@extend` and `@use` are
//! rejected with an error naming the at-rule.
//!
//! A rule's own declarations are printed before the rules nested inside it.

use anyhow::{Context, bail};

use super::{Handler, HandlerContext, ModuleSource, SourceKind, expect_kind};
use crate::scan::line_of;

#[derive(Debug, Default, Clone, Copy)]
pub struct SassHandler;

impl Handler for SassHandler {
    fn name(&self) -> &str {
        "sass"
    }

    fn transform(&self, source: ModuleSource, _cx: &HandlerContext<'_>) -> anyhow::Result<ModuleSource> {
        expect_kind(&source, SourceKind::Style, self.name())?;
        Ok(ModuleSource::new(compile(&source.code)?, SourceKind::Style))
    }
}

const UNSUPPORTED_AT_RULES: &[&str] = &[
    "mixin", "include", "function", "return", "extend", "use", "forward", "if", "else", "each",
    "for", "while", "content", "debug", "warn", "error", "at-root",
];

/// Compile SCSS source to CSS.
pub fn compile(source: &str) -> anyhow::Result<String> {
    let stripped = strip_comments(source);
    let nodes = Parser::new(&stripped).parse_block(true)?;

    let mut scopes = Scopes::default();
    let mut out = Vec::new();
    flatten(&nodes, &[], &mut scopes, &mut out)?;

    let mut css = String::new();
    print(&out, 0, &mut css);
    Ok(css)
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Variable {
        name: String,
        value: String,
        default: bool,
        global: bool,
        line: usize,
    },
    Declaration {
        property: String,
        value: String,
        line: usize,
    },
    /// Statement at-rule such as `@import` or `@charset`, kept verbatim.
    Statement(String),
    Rule {
        selector: String,
        children: Vec<Node>,
        line: usize,
    },
    AtBlock {
        header: String,
        children: Vec<Node>,
        line: usize,
    },
}

/// Remove comments, keeping line breaks so error lines stay correct.
fn strip_comments(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = String::with_capacity(source.len());
    let mut copied = 0;
    let mut i = 0;
    let mut parens = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote && bytes[i] != b'\n' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            b'(' => {
                parens += 1;
                i += 1;
            }
            b')' => {
                parens = parens.saturating_sub(1);
                i += 1;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                out.push_str(&source[copied..i]);
                let end = source[i + 2..]
                    .find("*/")
                    .map(|p| i + 2 + p + 2)
                    .unwrap_or(bytes.len());
                out.extend(std::iter::repeat_n('\n', source[i..end].matches('\n').count()));
                i = end;
                copied = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') && parens == 0 => {
                out.push_str(&source[copied..i]);
                let end = source[i..].find('\n').map(|p| i + p).unwrap_or(bytes.len());
                i = end;
                copied = end;
            }
            _ => i += 1,
        }
    }
    out.push_str(&source[copied.min(source.len())..]);
    out
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn line(&self) -> usize {
        line_of(self.src, self.pos)
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Read up to the next `{`, `;` or `}` that is not inside quotes, parens
    /// or an interpolation. `{` and `;` are consumed, `}` is not.
    fn read_until_delimiter(&mut self) -> (String, Option<u8>) {
        let bytes = self.src.as_bytes();
        let start = self.pos;
        let mut parens = 0usize;
        let mut interpolation = 0usize;

        while self.pos < bytes.len() {
            let b = bytes[self.pos];
            match b {
                b'"' | b'\'' => {
                    self.pos += 1;
                    while self.pos < bytes.len() && bytes[self.pos] != b {
                        if bytes[self.pos] == b'\\' {
                            self.pos += 1;
                        }
                        self.pos += 1;
                    }
                }
                b'#' if bytes.get(self.pos + 1) == Some(&b'{') => {
                    interpolation += 1;
                    self.pos += 1;
                }
                b'}' if interpolation > 0 => interpolation -= 1,
                b'(' => parens += 1,
                b')' => parens = parens.saturating_sub(1),
                b'{' | b';' if parens == 0 && interpolation == 0 => {
                    let text = self.src[start..self.pos].trim().to_string();
                    self.pos += 1;
                    return (text, Some(b));
                }
                b'}' if parens == 0 => {
                    return (self.src[start..self.pos].trim().to_string(), Some(b'}'));
                }
                _ => {}
            }
            self.pos += 1;
        }

        self.pos = bytes.len();
        (self.src[start..].trim().to_string(), None)
    }

    fn parse_block(&mut self, top_level: bool) -> anyhow::Result<Vec<Node>> {
        let mut nodes = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None if top_level => return Ok(nodes),
                None => bail!("unclosed block at end of file"),
                Some(b'}') if top_level => bail!("unexpected '}}' on line {}", self.line()),
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(nodes);
                }
                _ => {}
            }

            let line = self.line();
            let (text, delimiter) = self.read_until_delimiter();
            match delimiter {
                Some(b'{') => {
                    let children = self.parse_block(false)?;
                    nodes.push(block_node(text, children, line)?);
                }
                _ if text.is_empty() => {}
                _ => nodes.push(statement_node(&text, line)?),
            }
        }
    }
}

fn at_rule_name(text: &str) -> &str {
    let rest = &text[1..];
    let end = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '-'))
        .unwrap_or(rest.len());
    &rest[..end]
}

fn check_supported(text: &str, line: usize) -> anyhow::Result<()> {
    let name = at_rule_name(text);
    if UNSUPPORTED_AT_RULES.contains(&name) {
        bail!("@{name} is not supported (line {line})");
    }
    Ok(())
}

fn block_node(header: String, children: Vec<Node>, line: usize) -> anyhow::Result<Node> {
    if header.is_empty() {
        bail!("block without a selector on line {line}");
    }
    if header.starts_with('@') {
        check_supported(&header, line)?;
        Ok(Node::AtBlock {
            header,
            children,
            line,
        })
    } else {
        Ok(Node::Rule {
            selector: header,
            children,
            line,
        })
    }
}

fn statement_node(text: &str, line: usize) -> anyhow::Result<Node> {
    if text.starts_with('@') {
        check_supported(text, line)?;
        return Ok(Node::Statement(format!("{text};")));
    }

    let (name, value) = text
        .split_once(':')
        .with_context(|| format!("expected a declaration on line {line}, found '{text}'"))?;
    let name = name.trim();
    let mut value = value.trim().to_string();

    if let Some(variable) = name.strip_prefix('$') {
        let mut default = false;
        let mut global = false;
        loop {
            if let Some(rest) = value.strip_suffix("!default") {
                default = true;
                value = rest.trim_end().to_string();
            } else if let Some(rest) = value.strip_suffix("!global") {
                global = true;
                value = rest.trim_end().to_string();
            } else {
                break;
            }
        }
        return Ok(Node::Variable {
            name: variable.to_string(),
            value,
            default,
            global,
            line,
        });
    }

    Ok(Node::Declaration {
        property: name.to_string(),
        value,
        line,
    })
}

/// Variable scopes, innermost last.
#[derive(Debug)]
struct Scopes {
    frames: Vec<Vec<(String, String)>>,
}

impl Default for Scopes {
    fn default() -> Self {
        Self {
            frames: vec![Vec::new()],
        }
    }
}

impl Scopes {
    fn get(&self, name: &str) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn set(&mut self, name: String, value: String, global: bool) {
        let frame = if global {
            self.frames.first_mut()
        } else {
            self.frames.last_mut()
        };
        if let Some(frame) = frame {
            match frame.iter_mut().find(|(n, _)| *n == name) {
                Some(slot) => slot.1 = value,
                None => frame.push((name, value)),
            }
        }
    }

    fn push(&mut self) {
        self.frames.push(Vec::new());
    }

    fn pop(&mut self) {
        self.frames.pop();
    }
}

/// Replace `#{...}` interpolations and `$variables` outside quoted strings.
fn substitute(text: &str, scopes: &Scopes, line: usize) -> anyhow::Result<String> {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'#' && bytes.get(i + 1) == Some(&b'{') {
                        break;
                    }
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                if i < bytes.len() && bytes[i] == quote {
                    i += 1;
                }
            }
            b'#' if bytes.get(i + 1) == Some(&b'{') => {
                let close = text[i..]
                    .find('}')
                    .map(|p| i + p)
                    .with_context(|| format!("unterminated interpolation on line {line}"))?;
                out.push_str(&text[copied..i]);
                let inner = substitute(&text[i + 2..close], scopes, line)?;
                out.push_str(unquote(inner.trim()));
                i = close + 1;
                copied = i;
            }
            b'$' => {
                let end = text[i + 1..]
                    .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
                    .map(|p| i + 1 + p)
                    .unwrap_or(text.len());
                let name = &text[i + 1..end];
                if name.is_empty() {
                    i += 1;
                    continue;
                }
                let value = scopes
                    .get(name)
                    .with_context(|| format!("Undefined variable: ${name} (line {line})"))?;
                out.push_str(&text[copied..i]);
                out.push_str(value);
                i = end;
                copied = end;
            }
            _ => i += 1,
        }
    }
    out.push_str(&text[copied..]);
    Ok(out)
}

fn unquote(value: &str) -> &str {
    let quoted = value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')));
    if quoted { &value[1..value.len() - 1] } else { value }
}

/// Split a selector list on top-level commas.
fn split_selectors(selector: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in selector.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(selector[start..i].trim().to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(selector[start..].trim().to_string());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Combine parent selectors with a nested selector list.
fn resolve_selectors(parents: &[String], selector: &str, line: usize) -> anyhow::Result<Vec<String>> {
    let children = split_selectors(selector);
    if parents.is_empty() {
        if children.iter().any(|c| c.contains('&')) {
            bail!("top-level selector may not contain '&' (line {line})");
        }
        return Ok(children);
    }

    let mut resolved = Vec::with_capacity(parents.len() * children.len());
    for parent in parents {
        for child in &children {
            if child.contains('&') {
                resolved.push(child.replace('&', parent));
            } else {
                resolved.push(format!("{parent} {child}"));
            }
        }
    }
    Ok(resolved)
}

/// Flattened CSS.
#[derive(Debug)]
enum Output {
    Rule {
        selectors: Vec<String>,
        declarations: Vec<(String, String)>,
    },
    At {
        header: String,
        declarations: Vec<(String, String)>,
        body: Vec<Output>,
    },
    Statement(String),
}

fn flatten(
    nodes: &[Node],
    parents: &[String],
    scopes: &mut Scopes,
    out: &mut Vec<Output>,
) -> anyhow::Result<()> {
    // Declarations at this level land in a rule for `parents`, placed before
    // anything nested.
    let own = out.len();
    out.push(Output::Rule {
        selectors: parents.to_vec(),
        declarations: Vec::new(),
    });

    for node in nodes {
        match node {
            Node::Variable {
                name,
                value,
                default,
                global,
                line,
            } => {
                if *default && scopes.get(name).is_some() {
                    continue;
                }
                let value = substitute(value, scopes, *line)?;
                scopes.set(name.clone(), value, *global);
            }
            Node::Declaration {
                property,
                value,
                line,
            } => {
                if parents.is_empty() {
                    bail!("declarations may only be used within style rules (line {line})");
                }
                let property = substitute(property, scopes, *line)?;
                let value = substitute(value, scopes, *line)?;
                if let Output::Rule { declarations, .. } = &mut out[own] {
                    declarations.push((property, value));
                }
            }
            Node::Statement(text) => out.push(Output::Statement(text.clone())),
            Node::Rule {
                selector,
                children,
                line,
            } => {
                let selector = substitute(selector, scopes, *line)?;
                let selectors = resolve_selectors(parents, &selector, *line)?;
                scopes.push();
                let result = flatten(children, &selectors, scopes, out);
                scopes.pop();
                result?;
            }
            Node::AtBlock {
                header,
                children,
                line,
            } => {
                let header = substitute(header, scopes, *line)?;
                let mut body = Vec::new();
                scopes.push();
                let result = if parents.is_empty() {
                    flatten_at_root(children, scopes, &mut body)
                } else {
                    flatten(children, parents, scopes, &mut body).map(|()| Vec::new())
                };
                scopes.pop();
                let declarations = result?;
                out.push(Output::At {
                    header,
                    declarations,
                    body,
                });
            }
        }
    }

    let unused = matches!(&out[own], Output::Rule { declarations, .. } if declarations.is_empty());
    if unused {
        out.remove(own);
    }
    Ok(())
}

/// Children of a top-level at-rule. Bare declarations (`@font-face`) stay on
/// the at-rule itself.
fn flatten_at_root(
    nodes: &[Node],
    scopes: &mut Scopes,
    body: &mut Vec<Output>,
) -> anyhow::Result<Vec<(String, String)>> {
    let mut declarations = Vec::new();
    let mut rest = Vec::new();
    for node in nodes {
        match node {
            Node::Declaration {
                property,
                value,
                line,
            } => {
                flush(&mut rest, scopes, body)?;
                declarations.push((
                    substitute(property, scopes, *line)?,
                    substitute(value, scopes, *line)?,
                ));
            }
            other => rest.push(other.clone()),
        }
    }
    flush(&mut rest, scopes, body)?;
    Ok(declarations)
}

fn flush(pending: &mut Vec<Node>, scopes: &mut Scopes, body: &mut Vec<Output>) -> anyhow::Result<()> {
    if pending.is_empty() {
        return Ok(());
    }
    let nodes = std::mem::take(pending);
    flatten(&nodes, &[], scopes, body)
}

fn print(items: &[Output], depth: usize, css: &mut String) {
    let indent = "  ".repeat(depth);
    for item in items {
        match item {
            Output::Rule {
                selectors,
                declarations,
            } => {
                css.push_str(&format!("{indent}{} {{\n", selectors.join(", ")));
                print_declarations(declarations, depth + 1, css);
                css.push_str(&format!("{indent}}}\n"));
            }
            Output::At {
                header,
                declarations,
                body,
            } => {
                css.push_str(&format!("{indent}{header} {{\n"));
                print_declarations(declarations, depth + 1, css);
                print(body, depth + 1, css);
                css.push_str(&format!("{indent}}}\n"));
            }
            Output::Statement(text) => {
                css.push_str(&format!("{indent}{text}\n"));
            }
        }
    }
}

fn print_declarations(declarations: &[(String, String)], depth: usize, css: &mut String) {
    let indent = "  ".repeat(depth);
    for (property, value) in declarations {
        css.push_str(&format!("{indent}{property}: {value};\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_nesting_with_parent_selector() {
        let css = compile(
            r#"
$primary: #336699;
.nav {
  color: $primary;
  a, button {
    padding: 0;
    &:hover { color: red; }
  }
  &.open { display: block; }
}
"#,
        )
        .unwrap();

        assert_eq!(
            css,
            ".nav {\n  color: #336699;\n}\n\
             .nav a, .nav button {\n  padding: 0;\n}\n\
             .nav a:hover, .nav button:hover {\n  color: red;\n}\n\
             .nav.open {\n  display: block;\n}\n"
        );
    }

    #[test]
    fn variables_are_block_scoped() {
        let css = compile(
            "$w: 1px;\n.a { $w: 2px; border: $w solid; }\n.b { border: $w solid; }\n",
        )
        .unwrap();
        assert!(css.contains(".a {\n  border: 2px solid;\n}"));
        assert!(css.contains(".b {\n  border: 1px solid;\n}"));
    }

    #[test]
    fn default_only_assigns_when_unset() {
        let css = compile("$c: red;\n$c: blue !default;\n$d: green !default;\n.a { color: $c; background: $d; }")
            .unwrap();
        assert!(css.contains("color: red;"));
        assert!(css.contains("background: green;"));
    }

    #[test]
    fn interpolation_in_selectors_and_properties() {
        let css = compile("$side: left;\n$name: \"icon\";\n.#{$name}-x { margin-#{$side}: 0; }").unwrap();
        assert_eq!(css, ".icon-x {\n  margin-left: 0;\n}\n");
    }

    #[test]
    fn media_queries_bubble_up() {
        let css = compile(".a {\n  color: red;\n  @media (min-width: 600px) {\n    color: blue;\n  }\n}\n")
            .unwrap();
        assert_eq!(
            css,
            ".a {\n  color: red;\n}\n@media (min-width: 600px) {\n  .a {\n    color: blue;\n  }\n}\n"
        );
    }

    #[test]
    fn media_inside_nested_rule_uses_the_full_selector() {
        let css = compile(
            ".card {\n  .title {\n    font-size: 2em;\n    @media print {\n      font-size: 12pt;\n    }\n  }\n}\n@media (max-width: 400px) {\n  .card { padding: 0; }\n}\n",
        )
        .unwrap();
        assert_eq!(
            css,
            ".card .title {\n  font-size: 2em;\n}\n\
             @media print {\n  .card .title {\n    font-size: 12pt;\n  }\n}\n\
             @media (max-width: 400px) {\n  .card {\n    padding: 0;\n  }\n}\n"
        );
    }

    #[test]
    fn top_level_at_rules_keep_their_declarations() {
        let css = compile(
            "@font-face { font-family: X; src: url(//cdn.example.com/x.woff); }\n@keyframes spin { from { opacity: 0; } to { opacity: 1; } }",
        )
        .unwrap();
        assert!(css.starts_with("@font-face {\n  font-family: X;\n  src: url(//cdn.example.com/x.woff);\n}\n"));
        assert!(css.contains("@keyframes spin {\n  from {\n    opacity: 0;\n  }\n  to {\n    opacity: 1;\n  }\n}\n"));
    }

    #[test]
    fn strips_comments_but_keeps_strings() {
        let css = compile("// line\n/* block */\n.a { content: \"// not a comment\"; }").unwrap();
        assert_eq!(css, ".a {\n  content: \"// not a comment\";\n}\n");
    }

    #[test]
    fn keeps_imports() {
        let css = compile("@import url(\"base.css\");\n.a { color: red; }").unwrap();
        assert!(css.starts_with("@import url(\"base.css\");\n"));
    }

    #[test]
    fn undefined_variable_is_an_error() {
        let err = compile(".a {\n  color: $missing;\n}").unwrap_err();
        assert_eq!(err.to_string(), "Undefined variable: $missing (line 2)");
    }

    #[test]
    fn unsupported_at_rules_are_errors() {
        let err = compile("@mixin m { color: red; }").unwrap_err();
        assert!(err.to_string().contains("@mixin is not supported"));

        let err = compile(".a { @include m; }").unwrap_err();
        assert!(err.to_string().contains("@include is not supported"));
    }

    #[test]
    fn unbalanced_braces_are_errors() {
        assert!(compile(".a { color: red;").is_err());
        assert!(compile(".a { color: red; } }").is_err());
    }
}
