//! Development support: static server, file watcher and rebuild loop.

pub mod builder;
pub mod server;
pub mod watcher;

pub use builder::DevBuilder;
pub use server::{DevServer, ServerConfig, router};
pub use watcher::{FileChange, FileWatcher};
