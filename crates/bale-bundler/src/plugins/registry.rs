//! Ordered plugin list and hook dispatch.

use std::sync::Arc;

use bale_config::{ConfigError, PluginConfig};

use super::{BannerPlugin, HtmlPlugin, ManifestPlugin, NamedModulesPlugin, Plugin};
use crate::bundler::{BuildContext, BuildResult};
use crate::graph::ModuleGraph;
use crate::output::Assets;
use crate::{Error, Result};

/// Plugins in the order their hooks run.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate the built-in plugins listed in the configuration.
    pub fn from_config(configs: &[PluginConfig]) -> Result<Self> {
        let mut registry = Self::new();
        for (index, config) in configs.iter().enumerate() {
            let plugin: Arc<dyn Plugin> = match config {
                PluginConfig::Html(options) => Arc::new(HtmlPlugin::new(options.clone())),
                PluginConfig::NamedModules => Arc::new(NamedModulesPlugin),
                PluginConfig::Banner(options) => Arc::new(BannerPlugin::new(options).map_err(|e| {
                    ConfigError::InvalidPattern {
                        index,
                        field: "plugins.test",
                        message: e.to_string(),
                    }
                })?),
                PluginConfig::Manifest(options) => Arc::new(ManifestPlugin::new(options.clone())),
            };
            registry.add(plugin);
        }
        Ok(registry)
    }

    pub fn add(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn build_start(&self, cx: &BuildContext) -> Result<()> {
        self.run("buildStart", |plugin| plugin.build_start(cx))
    }

    pub fn after_resolve(&self, cx: &BuildContext, graph: &mut ModuleGraph) -> Result<()> {
        self.run("afterResolve", |plugin| plugin.after_resolve(cx, graph))
    }

    pub fn before_emit(&self, cx: &BuildContext, assets: &mut Assets) -> Result<()> {
        self.run("beforeEmit", |plugin| plugin.before_emit(cx, assets))
    }

    pub fn after_emit(&self, cx: &BuildContext, result: &BuildResult) -> Result<()> {
        self.run("afterEmit", |plugin| plugin.after_emit(cx, result))
    }

    fn run(
        &self,
        hook: &'static str,
        mut call: impl FnMut(&dyn Plugin) -> anyhow::Result<()>,
    ) -> Result<()> {
        for plugin in &self.plugins {
            tracing::trace!(plugin = plugin.name(), hook, "running plugin hook");
            call(plugin.as_ref()).map_err(|e| Error::Plugin {
                plugin: plugin.name().to_string(),
                hook,
                message: format!("{e:#}"),
            })?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
