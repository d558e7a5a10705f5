//! Command-line interface definition for the bale bundler.
//!
//! # Command Structure
//!
//! - `bale build` - Build once, or rebuild on changes with `--watch`
//! - `bale serve` - Serve the output directory, optionally rebuilding

mod commands;

use clap::Parser;

pub use commands::{BuildArgs, Command, ServeArgs};

/// bale - a config-driven bundler for browser applications
#[derive(Parser, Debug)]
#[command(
    name = "bale",
    version,
    about = "A config-driven bundler for browser applications",
    long_about = "bale reads a build description (bale.toml, bale.config.json or the\n\
                  `bale` field of package.json), bundles every entry with its dependency\n\
                  graph, and writes deterministic assets to the output directory."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
