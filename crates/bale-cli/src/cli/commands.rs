use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Available bale subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build every entry in the config
    ///
    /// Exits non-zero when the build aborts or reports any error diagnostic.
    Build(BuildArgs),

    /// Serve the output directory over HTTP
    ///
    /// With --watch, builds first and rebuilds whenever a source file changes.
    Serve(ServeArgs),
}

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Path to the config file
    ///
    /// Defaults to bale.toml, bale.config.json or the `bale` field of
    /// package.json in the current directory.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Rebuild when source files change
    #[arg(short, long)]
    pub watch: bool,
}

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to the config file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Port to listen on (overrides devServer.port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides devServer.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Build first and rebuild when source files change
    #[arg(short, long)]
    pub watch: bool,
}
