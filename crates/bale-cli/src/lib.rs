//! bale CLI - command-line front end for the bale bundler.
//!
//! Exposes the pieces of the `bale` binary as a library so they can be tested
//! and embedded.
//!
//! # Architecture
//!
//! - [`cli`] - clap argument definitions
//! - [`commands`] - `build` and `serve`
//! - [`dev`] - static file server, file watcher and rebuild loop
//! - [`error`] - [`CliError`] and miette conversion
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - status lines, spinner and build summaries
//!
//! # Example
//!
//! ```rust,no_run
//! use bale_cli::{error::Result, logger};
//!
//! fn main() -> Result<()> {
//!     logger::init_logger(false, false, false);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result, ResultExt};
