//! CLI argument parsing for the tenant-rag daemon.
//!
//! CLI flags override every other configuration source.

use clap::{Parser, Subcommand};
use rag_engine::AgentRole;

/// Tenant RAG daemon
///
/// Namespaced retrieval over per-tenant e-commerce data.
#[derive(Parser, Debug)]
#[command(name = "tenant-rag")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/tenant-rag/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Use the built-in demo store, hashing embedder, in-memory index and
    /// mock model instead of the configured providers
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Daemon commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bootstrap and schedule every active tenant, then run until Ctrl-C
    Run {
        /// Skip the initial sync of each tenant
        #[arg(long)]
        no_initial_sync: bool,
    },

    /// Create the namespaces of a store
    Bootstrap {
        store_id: String,
    },

    /// Run one manual sync of a store
    Sync {
        store_id: String,
    },

    /// Answer a question from a store's namespaces
    Search {
        store_id: String,

        query: String,

        /// Agent role selecting the namespaces to search
        #[arg(short, long, default_value = "general")]
        role: AgentRole,

        /// Maximum number of sources
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Conversation whose recent turns feed the prompt
        #[arg(long)]
        conversation: Option<String>,
    },

    /// Delete every namespace of a store
    Delete {
        store_id: String,
    },

    /// Print the lease table as JSON
    Locks {
        /// Only show leases of this store
        #[arg(long)]
        store: Option<String>,
    },

    /// Print the effective configuration as TOML, secrets masked
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_run() {
        let cli = Cli::parse_from(["tenant-rag", "run"]);
        match cli.command {
            Commands::Run { no_initial_sync } => assert!(!no_initial_sync),
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_with_config_and_offline() {
        let cli = Cli::parse_from([
            "tenant-rag",
            "--config",
            "/path/to/config.toml",
            "--offline",
            "sync",
            "42",
        ]);
        assert_eq!(cli.config, Some("/path/to/config.toml".to_string()));
        assert!(cli.offline);
        match cli.command {
            Commands::Sync { store_id } => assert_eq!(store_id, "42"),
            _ => panic!("Expected Sync command"),
        }
    }

    #[test]
    fn test_cli_search_defaults() {
        let cli = Cli::parse_from(["tenant-rag", "search", "42", "what do you sell?"]);
        match cli.command {
            Commands::Search {
                store_id,
                query,
                role,
                top_k,
                conversation,
            } => {
                assert_eq!(store_id, "42");
                assert_eq!(query, "what do you sell?");
                assert_eq!(role, AgentRole::General);
                assert_eq!(top_k, None);
                assert_eq!(conversation, None);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_search_role_and_top_k() {
        let cli = Cli::parse_from([
            "tenant-rag",
            "search",
            "42",
            "bestsellers",
            "--role",
            "product",
            "-k",
            "3",
        ]);
        match cli.command {
            Commands::Search { role, top_k, .. } => {
                assert_eq!(role, AgentRole::Product);
                assert_eq!(top_k, Some(3));
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_role() {
        let result = Cli::try_parse_from(["tenant-rag", "search", "42", "q", "--role", "pirate"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_locks_with_log_level() {
        let cli = Cli::parse_from(["tenant-rag", "--log-level", "debug", "locks", "--store", "42"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
        match cli.command {
            Commands::Locks { store } => assert_eq!(store, Some("42".to_string())),
            _ => panic!("Expected Locks command"),
        }
    }

    #[test]
    fn test_cli_config() {
        let cli = Cli::parse_from(["tenant-rag", "--log-level", "debug", "config"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert!(matches!(cli.command, Commands::Config));
    }
}
