//! Compiled transform rules.
//!
//! Rules are matched against the module's absolute path written with forward
//! slashes, so patterns like `node_modules/` behave the same on every platform.
//! The first matching rule wins.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bale_config::{ConfigError, TransformRule};
use regex::Regex;

use crate::handlers::{Handler, HandlerRegistry};
use crate::{Error, Result};

/// A rule with its patterns compiled and handler ids looked up.
pub struct CompiledRule {
    pub index: usize,
    test: Regex,
    exclude: Option<Regex>,
    include: Option<PathBuf>,
    /// Handler chain in declaration order (applied last to first).
    pub handlers: Vec<(String, Arc<dyn Handler>)>,
}

impl CompiledRule {
    pub fn matches(&self, path: &Path) -> bool {
        let normalized = normalize(path);
        if !self.test.is_match(&normalized) {
            return false;
        }
        if self.exclude.as_ref().is_some_and(|re| re.is_match(&normalized)) {
            return false;
        }
        match &self.include {
            Some(dir) => path.starts_with(dir),
            None => true,
        }
    }
}

impl std::fmt::Debug for CompiledRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledRule")
            .field("index", &self.index)
            .field("test", &self.test.as_str())
            .field("exclude", &self.exclude.as_ref().map(Regex::as_str))
            .field("include", &self.include)
            .field(
                "handlers",
                &self.handlers.iter().map(|(id, _)| id).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Ordered rule list.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile `rules`, resolving every handler id against `registry`.
    pub fn compile(rules: &[TransformRule], registry: &HandlerRegistry) -> Result<Self> {
        let compiled = rules
            .iter()
            .enumerate()
            .map(|(index, rule)| compile_rule(index, rule, registry))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules: compiled })
    }

    /// First rule that applies to `path`.
    pub fn find(&self, path: &Path) -> Option<&CompiledRule> {
        self.rules.iter().find(|rule| rule.matches(path))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn compile_rule(index: usize, rule: &TransformRule, registry: &HandlerRegistry) -> Result<CompiledRule> {
    let pattern = |field: &'static str, source: &str| {
        Regex::new(source).map_err(|e| ConfigError::InvalidPattern {
            index,
            field,
            message: e.to_string(),
        })
    };

    let handlers = rule
        .handlers
        .iter()
        .map(|id| {
            registry
                .get(id)
                .map(|handler| (id.clone(), Arc::clone(handler)))
                .ok_or_else(|| Error::UnknownHandler {
                    id: id.clone(),
                    rule: index,
                })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CompiledRule {
        index,
        test: pattern("test", &rule.test)?,
        exclude: rule
            .exclude
            .as_deref()
            .map(|source| pattern("exclude", source))
            .transpose()?,
        include: rule.include.clone(),
        handlers,
    })
}

fn normalize(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Vec<TransformRule> {
        vec![
            TransformRule::new(r"\.js$", &["babel-loader"]).exclude("node_modules"),
            TransformRule::new(r"\.scss$", &["style", "css", "sass"]).include("/app/src"),
            TransformRule::new(r"\.(js|scss)$", &["raw"]),
        ]
    }

    #[test]
    fn first_matching_rule_wins() {
        let set = RuleSet::compile(&rules(), &HandlerRegistry::builtin()).unwrap();
        assert_eq!(set.len(), 3);

        assert_eq!(set.find(Path::new("/app/src/a.js")).unwrap().index, 0);
        assert_eq!(set.find(Path::new("/app/node_modules/x/a.js")).unwrap().index, 2);
        assert_eq!(set.find(Path::new("/app/src/a.scss")).unwrap().index, 1);
        assert_eq!(set.find(Path::new("/app/other/a.scss")).unwrap().index, 2);
        assert!(set.find(Path::new("/app/src/a.json")).is_none());
    }

    #[test]
    fn keeps_handler_order() {
        let set = RuleSet::compile(&rules(), &HandlerRegistry::builtin()).unwrap();
        let rule = set.find(Path::new("/app/src/a.scss")).unwrap();
        let ids: Vec<_> = rule.handlers.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["style", "css", "sass"]);
    }

    #[test]
    fn unknown_handler_is_a_config_error() {
        let err = RuleSet::compile(
            &[TransformRule::new(r"\.ts$", &["ts-loader"])],
            &HandlerRegistry::builtin(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownHandler { ref id, rule: 0 } if id == "ts-loader"));
        assert_eq!(err.kind(), crate::ErrorKind::Config);
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let err = RuleSet::compile(&[TransformRule::new("(", &["raw"])], &HandlerRegistry::builtin())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidPattern { field: "test", .. })
        ));
    }
}
