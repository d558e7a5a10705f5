//! `named-modules`: register modules under their context-relative paths
//! instead of numbers, which makes bundles readable while debugging.

use super::Plugin;
use crate::bundler::BuildContext;
use crate::graph::{ModuleGraph, ModuleId};

#[derive(Debug, Default, Clone, Copy)]
pub struct NamedModulesPlugin;

impl Plugin for NamedModulesPlugin {
    fn name(&self) -> &str {
        "named-modules"
    }

    fn after_resolve(&self, _cx: &BuildContext, graph: &mut ModuleGraph) -> anyhow::Result<()> {
        for module in graph.modules_mut() {
            module.id = ModuleId::Named(module.name.clone());
        }
        Ok(())
    }
}
