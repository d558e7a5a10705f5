//! Pluggable config validation strategies
//!
//! Separates schema validation (no I/O, used for in-memory descriptions) from
//! filesystem validation (context root, include paths, templates).

use regex::Regex;

use crate::config::{BuildConfig, MinChunks};
use crate::error::{ConfigError, Result};
use crate::plugin::PluginConfig;

/// Trait for pluggable config validation strategies
pub trait ConfigValidator {
    fn validate(&self, config: &BuildConfig) -> Result<()>;
}

/// Schema-only validation (no filesystem checks)
///
/// # Example
///
/// ```
/// use bale_config::{BuildConfig, ConfigValidator, SchemaValidator};
///
/// let mut config = BuildConfig::default();
/// config.entry.insert("bundle".into(), vec!["./index.js".into()]);
/// config.output.path = "/srv/dist".into();
///
/// SchemaValidator.validate(&config).unwrap();
/// ```
pub struct SchemaValidator;

impl ConfigValidator for SchemaValidator {
    fn validate(&self, config: &BuildConfig) -> Result<()> {
        // Entry validation
        if config.entry.is_empty() {
            return Err(ConfigError::NoEntries);
        }

        for (name, modules) in &config.entry {
            if name.trim().is_empty() {
                return Err(ConfigError::SchemaValidation {
                    message: "entry names cannot be empty".to_string(),
                    hint: Some("Give every bundle in [entry] a name".to_string()),
                });
            }
            if modules.is_empty() || modules.iter().any(|m| m.trim().is_empty()) {
                return Err(ConfigError::EmptyEntry { name: name.clone() });
            }
        }

        if !config.output.path.is_absolute() {
            return Err(ConfigError::RelativeOutputDir {
                path: config.output.path.clone(),
            });
        }

        validate_filename_pattern("output.filename", &config.output.filename)?;
        let shared = &config.shared_chunk;
        let shared_has_own_file = shared.enabled && shared.filename.is_some();
        let chunks_on_output_filename = config
            .entry
            .keys()
            .filter(|name| !(shared_has_own_file && **name == shared.name))
            .count();
        if chunks_on_output_filename > 1 && !is_distinct_per_chunk(&config.output.filename) {
            return Err(ConfigError::SchemaValidation {
                message: format!(
                    "output.filename '{}' would give every entry the same file name",
                    config.output.filename
                ),
                hint: Some("Include [name] or [contenthash] in output.filename".to_string()),
            });
        }

        let public_path = &config.output.public_path;
        if !public_path.is_empty() && !public_path.ends_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "output.publicPath".to_string(),
                hint: Some(format!("Use '{public_path}/' (public paths end with a slash)")),
            });
        }

        // Shared chunk
        if shared.enabled {
            if shared.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "sharedChunk.name".to_string(),
                    hint: Some("Name the shared chunk, e.g. \"vendor\"".to_string()),
                });
            }
            if let MinChunks::Count(min) = shared.min_chunks {
                if min < 2 {
                    return Err(ConfigError::SchemaValidation {
                        message: format!("sharedChunk.minChunks must be at least 2, got {min}"),
                        hint: Some(
                            "Use 2 to share modules used by two entries, or \"Infinity\""
                                .to_string(),
                        ),
                    });
                }
            }
            if let Some(filename) = &shared.filename {
                validate_filename_pattern("sharedChunk.filename", filename)?;
                if *filename == config.output.filename && !is_distinct_per_chunk(filename) {
                    return Err(ConfigError::SchemaValidation {
                        message: format!(
                            "sharedChunk.filename '{filename}' is the same file as output.filename"
                        ),
                        hint: Some("Give the shared chunk its own file name".to_string()),
                    });
                }
            }
        }

        // Rules
        for (index, rule) in config.rules.iter().enumerate() {
            compile(index, "test", &rule.test)?;
            if let Some(exclude) = &rule.exclude {
                compile(index, "exclude", exclude)?;
            }
            if rule.handlers.is_empty() {
                return Err(ConfigError::EmptyRule { index });
            }
        }

        // Plugins
        for plugin in &config.plugins {
            match plugin {
                PluginConfig::Html(html) if html.filename.trim().is_empty() => {
                    return Err(ConfigError::InvalidValue {
                        field: "plugins.html.filename".to_string(),
                        hint: Some("Set a file name such as index.html".to_string()),
                    });
                }
                PluginConfig::Banner(banner) => {
                    if let Some(test) = &banner.test {
                        Regex::new(test).map_err(|e| ConfigError::InvalidValue {
                            field: "plugins.banner.test".to_string(),
                            hint: Some(e.to_string()),
                        })?;
                    }
                }
                _ => {}
            }
        }

        if config.dev_server.index.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "devServer.index".to_string(),
                hint: Some("Set the fallback document, e.g. index.html".to_string()),
            });
        }

        Ok(())
    }
}

fn compile(index: usize, field: &'static str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
        index,
        field,
        message: e.to_string(),
    })
}

/// The pattern gives each chunk its own file.
fn is_distinct_per_chunk(pattern: &str) -> bool {
    pattern.contains("[name]") || pattern.contains("[contenthash")
}

fn validate_filename_pattern(field: &str, pattern: &str) -> Result<()> {
    if pattern.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            hint: Some("Use a pattern such as [name].js".to_string()),
        });
    }

    let mut rest = pattern;
    while let Some(start) = rest.find("[contenthash:") {
        let after = &rest[start + "[contenthash:".len()..];
        let end = after.find(']').ok_or_else(|| ConfigError::InvalidValue {
            field: field.to_string(),
            hint: Some("Close the [contenthash:N] placeholder".to_string()),
        })?;
        match after[..end].parse::<usize>() {
            Ok(len) if (1..=64).contains(&len) => {}
            _ => {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    hint: Some("[contenthash:N] takes a length between 1 and 64".to_string()),
                });
            }
        }
        rest = &after[end..];
    }

    Ok(())
}

/// Filesystem validator (for CLI use)
///
/// Runs [`SchemaValidator`] first, then checks that the context root, rule
/// `include` directories and HTML templates exist on disk.
pub struct FsValidator;

impl ConfigValidator for FsValidator {
    fn validate(&self, config: &BuildConfig) -> Result<()> {
        // First run schema validation
        SchemaValidator.validate(config)?;

        if !config.context.is_dir() {
            return Err(ConfigError::ContextNotFound {
                path: config.context.clone(),
            });
        }

        for rule in &config.rules {
            if let Some(include) = &rule.include {
                if !include.exists() {
                    return Err(ConfigError::IncludeNotFound {
                        path: include.clone(),
                    });
                }
            }
        }

        for plugin in &config.plugins {
            if let PluginConfig::Html(html) = plugin {
                if let Some(template) = &html.template {
                    if !template.is_file() {
                        return Err(ConfigError::TemplateNotFound {
                            path: template.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

/// Convenience function for schema-only validation
pub fn validate_schema(config: &BuildConfig) -> Result<()> {
    SchemaValidator.validate(config)
}

/// Convenience function for full validation, including filesystem checks
pub fn validate_fs(config: &BuildConfig) -> Result<()> {
    FsValidator.validate(config)
}
