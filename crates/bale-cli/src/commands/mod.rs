//! Command implementations for the bale CLI.
//!
//! - [`build`] - Build once or in watch mode
//! - [`serve`] - Static dev server with optional rebuilds
//!
//! Each command provides an `execute` function that takes the parsed
//! arguments and returns a Result.

pub mod build;
pub mod serve;
pub(crate) mod utils;

pub use build::execute as build_execute;
pub use serve::execute as serve_execute;
