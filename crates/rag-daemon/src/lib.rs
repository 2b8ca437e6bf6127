//! tenant-rag daemon library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `context`: Service composition from settings
//! - `commands`: Command implementations
//! - `demo`: Built-in store for offline mode

pub mod cli;
pub mod commands;
pub mod context;
pub mod demo;

pub use cli::{Cli, Commands};
pub use commands::{
    handle_bootstrap, handle_delete, handle_search, handle_sync, init_logging, load_settings,
    run_daemon, show_config, show_locks,
};
pub use context::AppContext;
