//! tenant-rag daemon
//!
//! Namespaced multi-tenant retrieval over e-commerce store data.
//!
//! # Usage
//!
//! ```bash
//! tenant-rag run
//! tenant-rag sync <STORE_ID>
//! tenant-rag search <STORE_ID> "<QUERY>" [--role product] [--top-k 5]
//! tenant-rag config
//! tenant-rag --offline search demo "what coffee do you sell?"
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/tenant-rag/config.toml)
//! 3. `--config` file
//! 4. Environment variables (TENANT_RAG_*)
//! 5. CLI flags

use anyhow::Result;
use clap::Parser;

use rag_daemon::{
    handle_bootstrap, handle_delete, handle_search, handle_sync, init_logging, load_settings,
    run_daemon, show_config, show_locks, AppContext, Cli, Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref(), cli.log_level.as_deref())?;
    init_logging(&settings.log_level)?;

    if let Commands::Config = cli.command {
        return show_config(&settings);
    }
    let ctx = AppContext::build(settings, cli.offline).await?;

    match cli.command {
        Commands::Run { no_initial_sync } => {
            run_daemon(&ctx, !no_initial_sync).await?;
        }
        Commands::Bootstrap { store_id } => {
            handle_bootstrap(&ctx, &store_id).await?;
        }
        Commands::Sync { store_id } => {
            handle_sync(&ctx, &store_id).await?;
        }
        Commands::Search {
            store_id,
            query,
            role,
            top_k,
            conversation,
        } => {
            handle_search(&ctx, &store_id, &query, role, top_k, conversation).await?;
        }
        Commands::Delete { store_id } => {
            handle_delete(&ctx, &store_id).await?;
        }
        Commands::Locks { store } => {
            show_locks(&ctx, store.as_deref())?;
        }
        Commands::Config => show_config(&ctx.settings)?,
    }

    Ok(())
}
