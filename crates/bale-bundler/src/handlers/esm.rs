//! ES module lowering.
//!
//! Rewrites static `import`/`export` statements into the bundle's module
//! format: every module is a `function (module, exports, require)` and exports
//! are installed as getters through `require.define`, so exported bindings stay
//! live. The module is parsed with oxc and rewritten by span; replacements keep
//! the original line count, which keeps line-based source maps accurate.
//!
//! `import("m")` with a string literal becomes a promise of `require("m")`.
//! The lowered code must parse as a classic script; anything that does not
//! (`import.meta`, top-level `await`) is reported with its line.

use anyhow::{anyhow, bail};
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingIdentifier, Declaration, ExportAllDeclaration, ExportDefaultDeclaration,
    ExportDefaultDeclarationKind, ExportNamedDeclaration, Expression, ImportDeclaration,
    ImportDeclarationSpecifier, ImportExpression, ModuleDeclaration, ModuleExportName, Program,
};
use oxc_ast_visit::{Visit, walk};
use oxc_span::{GetSpan, SourceType, Span};

use super::{Handler, HandlerContext, ModuleSource, SourceKind, expect_kind};
use crate::scan::{self, line_of};

/// `babel` / `babel-loader`: lower ES module syntax.
#[derive(Debug, Default, Clone, Copy)]
pub struct EsmHandler;

impl Handler for EsmHandler {
    fn name(&self) -> &str {
        "babel"
    }

    fn transform(&self, source: ModuleSource, _cx: &HandlerContext<'_>) -> anyhow::Result<ModuleSource> {
        expect_kind(&source, SourceKind::Script, self.name())?;
        Ok(ModuleSource::script(lower(&source.code)?))
    }
}

const DEFAULT_LOCAL: &str = "__bale_default__";

struct Edit {
    span: Span,
    text: String,
}

/// Lowering state for one module.
struct Lowering<'s> {
    code: &'s str,
    edits: Vec<Edit>,
    /// Exported name to the expression that reads it.
    getters: Vec<(String, String)>,
    is_esm: bool,
    next_binding: usize,
}

impl<'s> Lowering<'s> {
    fn new(code: &'s str) -> Self {
        Self {
            code,
            edits: Vec::new(),
            getters: Vec::new(),
            is_esm: false,
            next_binding: 0,
        }
    }

    fn binding(&mut self, prefix: &str) -> String {
        let name = format!("__bale_{prefix}_{}__", self.next_binding);
        self.next_binding += 1;
        name
    }

    /// Replace `span`, keeping as many line breaks as it covered.
    fn replace(&mut self, span: Span, text: String) {
        let newlines = self.code[span.start as usize..span.end as usize]
            .matches('\n')
            .count();
        self.edits.push(Edit {
            span,
            text: text + &"\n".repeat(newlines),
        });
    }

    fn export(&mut self, exported: impl Into<String>, read: impl Into<String>) {
        self.getters.push((exported.into(), read.into()));
    }

    fn module_declaration(&mut self, declaration: &ModuleDeclaration<'_>) -> anyhow::Result<()> {
        self.is_esm = true;
        match declaration {
            ModuleDeclaration::ImportDeclaration(import) => self.import(import),
            ModuleDeclaration::ExportAllDeclaration(export) => self.export_all(export),
            ModuleDeclaration::ExportNamedDeclaration(export) => self.export_named(export)?,
            ModuleDeclaration::ExportDefaultDeclaration(export) => self.export_default(export),
            other => bail!(
                "unsupported module syntax on line {}",
                line_of(self.code, other.span().start as usize)
            ),
        }
        Ok(())
    }

    fn import(&mut self, import: &ImportDeclaration<'_>) {
        let src = js_string(import.source.value.as_str());
        let text = match import.specifiers.as_ref().filter(|s| !s.is_empty()) {
            None => format!("require({src});"),
            Some(specifiers) => {
                let mut clause = ImportClause::default();
                for specifier in specifiers {
                    match specifier {
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                            clause.default = Some(s.local.name.to_string());
                        }
                        ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                            clause.namespace = Some(s.local.name.to_string());
                        }
                        ImportDeclarationSpecifier::ImportSpecifier(s) => {
                            clause.named.push((export_name(&s.imported), s.local.name.to_string()));
                        }
                    }
                }
                clause.lower(&src, self)
            }
        };
        self.replace(import.span, text);
    }

    fn export_all(&mut self, export: &ExportAllDeclaration<'_>) {
        let src = js_string(export.source.value.as_str());
        let text = match &export.exported {
            None => format!("require.star(exports, require({src}));"),
            Some(name) => {
                let local = self.binding("reexport");
                self.export(export_name(name), local.clone());
                format!("var {local} = require({src});")
            }
        };
        self.replace(export.span, text);
    }

    fn export_named(&mut self, export: &ExportNamedDeclaration<'_>) -> anyhow::Result<()> {
        if let Some(source) = &export.source {
            let local = self.binding("reexport");
            for specifier in &export.specifiers {
                let read = member(&local, &export_name(&specifier.local));
                self.export(export_name(&specifier.exported), read);
            }
            let text = format!("var {local} = require({});", js_string(source.value.as_str()));
            self.replace(export.span, text);
            return Ok(());
        }

        let Some(declaration) = &export.declaration else {
            for specifier in &export.specifiers {
                self.export(export_name(&specifier.exported), export_name(&specifier.local));
            }
            self.replace(export.span, String::new());
            return Ok(());
        };

        let names = match declaration {
            Declaration::VariableDeclaration(variables) => {
                let mut bound = BoundNames::default();
                for declarator in &variables.declarations {
                    bound.visit_binding_pattern(&declarator.id);
                }
                bound.names
            }
            Declaration::FunctionDeclaration(function) => identifier_names(function.id.as_ref()),
            Declaration::ClassDeclaration(class) => identifier_names(class.id.as_ref()),
            other => bail!(
                "unsupported export declaration on line {}",
                line_of(self.code, other.span().start as usize)
            ),
        };
        for name in names {
            self.export(name.clone(), name);
        }
        // Drop only the `export` keyword; the declaration itself stays.
        self.replace(Span::new(export.span.start, declaration.span().start), String::new());
        Ok(())
    }

    fn export_default(&mut self, export: &ExportDefaultDeclaration<'_>) {
        let (name, start) = match &export.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(function) => {
                (function.id.as_ref().map(|id| id.name.to_string()), function.span.start)
            }
            ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                (class.id.as_ref().map(|id| id.name.to_string()), class.span.start)
            }
            other => (None, other.span().start),
        };
        let prefix = Span::new(export.span.start, start);
        match name {
            Some(name) => {
                self.export("default", name);
                self.replace(prefix, String::new());
            }
            None => {
                self.export("default", DEFAULT_LOCAL);
                self.replace(prefix, format!("var {DEFAULT_LOCAL} = "));
            }
        }
    }
}

/// Lower ES module syntax in `code`. Scripts without module syntax or
/// literal dynamic imports are returned unchanged.
///
/// # Errors
///
/// Syntax errors, and module syntax that has no script equivalent.
pub fn lower(code: &str) -> anyhow::Result<String> {
    let allocator = Allocator::default();
    let program = parse_module(&allocator, code)?;
    let mut state = Lowering::new(code);

    for statement in &program.body {
        if let Some(declaration) = statement.as_module_declaration() {
            state.module_declaration(declaration)?;
        }
    }

    let mut dynamic = DynamicImports::default();
    dynamic.visit_program(&program);
    for (span, specifier) in dynamic.found {
        let text = format!(
            "Promise.resolve().then(function () {{ return require({}); }})",
            js_string(&specifier)
        );
        state.replace(span, text);
    }

    let lowered = apply_edits(code, state.edits)?;
    let check = Allocator::default();
    scan::parse_script(&check, &lowered).map_err(|e| anyhow!("unsupported module syntax on {e}"))?;

    if !state.is_esm {
        return Ok(lowered);
    }

    let getters = state
        .getters
        .iter()
        .map(|(exported, read)| format!("{}: function () {{ return {read}; }}", js_string(exported)))
        .collect::<Vec<_>>()
        .join(", ");
    let preamble = if getters.is_empty() {
        "require.define(exports, {}); ".to_string()
    } else {
        format!("require.define(exports, {{ {getters} }}); ")
    };

    Ok(preamble + &lowered)
}

/// Parse as a module, falling back to a sloppy-mode script.
fn parse_module<'a>(allocator: &'a Allocator, code: &'a str) -> anyhow::Result<Program<'a>> {
    match scan::parse(allocator, code, SourceType::mjs()) {
        Ok(program) => Ok(program),
        Err(module_error) => {
            scan::parse_script(allocator, code).map_err(|_| anyhow!("syntax error on {module_error}"))
        }
    }
}

fn apply_edits(code: &str, mut edits: Vec<Edit>) -> anyhow::Result<String> {
    edits.sort_by_key(|e| e.span.start);
    let mut out = String::with_capacity(code.len() + 256);
    let mut cursor = 0;
    for edit in edits {
        let (start, end) = (edit.span.start as usize, edit.span.end as usize);
        if start < cursor {
            bail!("overlapping module statements on line {}", line_of(code, start));
        }
        out.push_str(&code[cursor..start]);
        out.push_str(&edit.text);
        cursor = end;
    }
    out.push_str(&code[cursor..]);
    Ok(out)
}

/// Names bound by a declaration pattern. Default values are not walked, so
/// parameters of functions inside them do not count.
#[derive(Default)]
struct BoundNames {
    names: Vec<String>,
}

impl<'a> Visit<'a> for BoundNames {
    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        self.names.push(ident.name.to_string());
    }

    fn visit_expression(&mut self, _expr: &Expression<'a>) {}
}

/// `import("literal")` expressions anywhere in the module.
#[derive(Default)]
struct DynamicImports {
    found: Vec<(Span, String)>,
}

impl<'a> Visit<'a> for DynamicImports {
    fn visit_import_expression(&mut self, expr: &ImportExpression<'a>) {
        match &expr.source {
            Expression::StringLiteral(literal) => {
                self.found.push((expr.span, literal.value.to_string()));
            }
            _ => walk::walk_import_expression(self, expr),
        }
    }
}

fn identifier_names(id: Option<&BindingIdentifier<'_>>) -> Vec<String> {
    id.map(|id| id.name.to_string()).into_iter().collect()
}

fn export_name(name: &ModuleExportName<'_>) -> String {
    match name {
        ModuleExportName::IdentifierName(ident) => ident.name.to_string(),
        ModuleExportName::IdentifierReference(ident) => ident.name.to_string(),
        ModuleExportName::StringLiteral(literal) => literal.value.to_string(),
    }
}

/// Quote a specifier or property name as a JavaScript string literal.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

fn member(object: &str, property: &str) -> String {
    if property == "default" {
        format!("require.interop({object})")
    } else {
        format!("{object}[{}]", js_string(property))
    }
}

#[derive(Debug, Default, PartialEq)]
struct ImportClause {
    default: Option<String>,
    namespace: Option<String>,
    named: Vec<(String, String)>,
}

impl ImportClause {
    fn lower(&self, src: &str, state: &mut Lowering<'_>) -> String {
        if self.default.is_none() && self.named.is_empty() {
            if let Some(ns) = &self.namespace {
                return format!("var {ns} = require({src});");
            }
        }

        let module = state.binding("import");
        let mut parts = vec![format!("var {module} = require({src});")];
        if let Some(name) = &self.default {
            parts.push(format!("var {name} = require.interop({module});"));
        }
        if let Some(ns) = &self.namespace {
            parts.push(format!("var {ns} = {module};"));
        }
        for (imported, local) in &self.named {
            parts.push(format!("var {local} = {};", member(&module, imported)));
        }
        parts.join(" ")
    }
}
