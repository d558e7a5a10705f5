//! Helpers shared by the commands.

use crate::error::Result;
use bale_config::BuildConfig;
use std::path::Path;

/// Load the config at `path`, or discover one in the working directory.
pub(crate) fn load_config(path: Option<&Path>) -> Result<BuildConfig> {
    let config = match path {
        Some(path) => bale_config::load_config(path)?,
        None => bale_config::discover()?,
    };

    tracing::debug!(
        context = %config.context.display(),
        output = %config.output.path.display(),
        "config loaded"
    );
    Ok(config)
}
