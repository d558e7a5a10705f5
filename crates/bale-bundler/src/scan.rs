//! Script parsing and dependency scanning.
//!
//! Module code is parsed with oxc. Dependencies are the `require("literal")`
//! calls anywhere in the transformed script, template substitutions and
//! nested functions included.

use std::ops::Range;

use anyhow::bail;
use oxc_allocator::Allocator;
use oxc_ast::ast::{Argument, CallExpression, Expression, Program};
use oxc_ast_visit::{Visit, walk};
use oxc_parser::{ParseOptions, Parser};
use oxc_span::SourceType;

/// A `require("...")` call found in code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequireCall {
    pub specifier: String,
    /// Byte range of the string literal, quotes included.
    pub literal: Range<usize>,
}

/// Parse `code` with `source_type`, failing on the first syntax error.
///
/// Top-level `return` is accepted: module code ends up inside a function.
pub fn parse<'a>(allocator: &'a Allocator, code: &'a str, source_type: SourceType) -> anyhow::Result<Program<'a>> {
    let options = ParseOptions {
        allow_return_outside_function: true,
        ..ParseOptions::default()
    };
    let ret = Parser::new(allocator, code, source_type).with_options(options).parse();

    if let Some(error) = ret.errors.first() {
        let offset = error
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map_or(0, |label| label.offset());
        bail!("line {}: {}", line_of(code, offset), error.message);
    }
    if ret.panicked {
        bail!("line 1: the parser could not recover");
    }
    Ok(ret.program)
}

/// Parse `code` as a classic script, the form every module takes in a bundle.
pub fn parse_script<'a>(allocator: &'a Allocator, code: &'a str) -> anyhow::Result<Program<'a>> {
    parse(allocator, code, SourceType::cjs())
}

/// Every `require("literal")` call in `code`, in source order.
///
/// # Errors
///
/// Fails when `code` is not a valid script.
pub fn find_requires(code: &str) -> anyhow::Result<Vec<RequireCall>> {
    let allocator = Allocator::default();
    let program = parse_script(&allocator, code)?;
    let mut finder = RequireFinder::default();
    finder.visit_program(&program);
    Ok(finder.calls)
}

#[derive(Default)]
struct RequireFinder {
    calls: Vec<RequireCall>,
}

impl<'a> Visit<'a> for RequireFinder {
    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &call.callee {
            if callee.name.as_str() == "require" && call.arguments.len() == 1 {
                if let Argument::StringLiteral(literal) = &call.arguments[0] {
                    self.calls.push(RequireCall {
                        specifier: literal.value.to_string(),
                        literal: literal.span.start as usize..literal.span.end as usize,
                    });
                }
            }
        }
        walk::walk_call_expression(self, call);
    }
}

/// 1-based line number of a byte offset.
pub fn line_of(code: &str, offset: usize) -> usize {
    let end = offset.min(code.len());
    code.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specifiers(code: &str) -> Vec<String> {
        find_requires(code)
            .unwrap()
            .into_iter()
            .map(|r| r.specifier)
            .collect()
    }

    #[test]
    fn finds_requires_in_code_only() {
        let code = r#"
var a = require("./a");
// var b = require("./b");
/* require('./c') */
var s = "require('./d')";
var e = require('./e');
obj.require("./f");
"#;
        assert_eq!(specifiers(code), ["./a", "./e"]);
    }

    #[test]
    fn finds_requires_inside_template_substitutions() {
        let code = "console.log(`v=${require('./b')}`);\nvar t = `require('./not')`;\n";
        assert_eq!(specifiers(code), ["./b"]);
    }

    #[test]
    fn finds_requires_in_nested_functions() {
        let code = "module.exports = function () {\n  return [1].map(() => require('./lazy'));\n};\n";
        assert_eq!(specifiers(code), ["./lazy"]);
    }

    #[test]
    fn literal_range_covers_quotes() {
        let code = r#"require( "./a" )"#;
        let call = &find_requires(code).unwrap()[0];
        assert_eq!(&code[call.literal.clone()], "\"./a\"");
    }

    #[test]
    fn regex_literals_and_division() {
        let code = "var re = /'/g; var half = total / 2; var x = require('./x');";
        assert_eq!(specifiers(code), ["./x"]);
    }

    #[test]
    fn computed_requires_are_not_dependencies() {
        assert!(specifiers("var name = './a'; require(name); require('./a', 1);").is_empty());
    }

    #[test]
    fn top_level_return_is_allowed() {
        assert_eq!(specifiers("if (done) return;\nrequire('./x');\n"), ["./x"]);
    }

    #[test]
    fn syntax_errors_carry_the_line() {
        let err = find_requires("var a = 1;\nvar = ;\n").unwrap_err();
        assert!(err.to_string().starts_with("line 2:"), "{err}");
    }

    #[test]
    fn line_of_counts_newlines() {
        assert_eq!(line_of("a\nb\nc", 4), 3);
        assert_eq!(line_of("abc", 0), 1);
    }
}
