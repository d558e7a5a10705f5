//! bale CLI - config-driven bundler and static dev server.
//!
//! Parses the command line, installs logging and dispatches to the command
//! implementations in `bale_cli::commands`.

use bale_cli::{cli, commands, error, logger, ui};
use clap::Parser;
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    let result = match args.command {
        cli::Command::Build(build_args) => commands::build_execute(build_args).await,
        cli::Command::Serve(serve_args) => commands::serve_execute(serve_args).await,
    };

    // miette renders the report and main's Err return sets exit code 1.
    result.map_err(error::cli_error_to_miette)
}
