//! Plugin system.
//!
//! Plugins observe and modify a build at four hooks, always in declaration
//! order:
//!
//! | hook           | runs                              | may change        |
//! |----------------|-----------------------------------|-------------------|
//! | `buildStart`   | before any module is loaded       | nothing           |
//! | `afterResolve` | once the module graph is complete | module ids, code  |
//! | `beforeEmit`   | after rendering, before writing   | the asset set     |
//! | `afterEmit`    | after the output is written       | nothing           |
//!
//! A hook error aborts the build as a plugin error.

pub mod banner;
pub mod html;
pub mod manifest;
pub mod named_modules;
pub mod registry;

pub use banner::BannerPlugin;
pub use html::HtmlPlugin;
pub use manifest::ManifestPlugin;
pub use named_modules::NamedModulesPlugin;
pub use registry::PluginRegistry;

use crate::bundler::{BuildContext, BuildResult};
use crate::graph::ModuleGraph;
use crate::output::Assets;

/// A build plugin. Every hook defaults to doing nothing.
pub trait Plugin: Send + Sync {
    /// Name used in error messages.
    fn name(&self) -> &str;

    fn build_start(&self, _cx: &BuildContext) -> anyhow::Result<()> {
        Ok(())
    }

    fn after_resolve(&self, _cx: &BuildContext, _graph: &mut ModuleGraph) -> anyhow::Result<()> {
        Ok(())
    }

    fn before_emit(&self, _cx: &BuildContext, _assets: &mut Assets) -> anyhow::Result<()> {
        Ok(())
    }

    fn after_emit(&self, _cx: &BuildContext, _result: &BuildResult) -> anyhow::Result<()> {
        Ok(())
    }
}
