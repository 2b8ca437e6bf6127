//! Command implementations for the tenant-rag daemon.
//!
//! Handles:
//! - run: bootstrap and schedule active tenants, wait for a shutdown signal
//! - bootstrap, sync, delete: one tenant operation each
//! - search: one retrieval query
//! - locks: lease table snapshot
//! - config: effective settings

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::signal;
use tracing::{info, warn};

use rag_engine::{AgentRole, RagAnswer, SearchContext, SearchOptions};
use rag_namespaces::{BootstrapReport, DeleteReport, TenantLifecycle};
use rag_platform::TenantDirectory;
use rag_types::{Settings, SyncResult};

use crate::context::AppContext;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Load configuration and apply CLI overrides (highest precedence).
pub fn load_settings(config_path: Option<&str>, log_level_override: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// configured level. Logs go to stderr so command output stays parseable.
pub fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

const MASK: &str = "********";

/// Render settings as TOML with API keys and access tokens masked.
pub fn render_config(settings: &Settings) -> Result<String> {
    let mut settings = settings.clone();
    for key in [
        &mut settings.embeddings.api_key,
        &mut settings.llm.api_key,
        &mut settings.vector.api_key,
    ] {
        if key.is_some() {
            *key = Some(MASK.to_string());
        }
    }
    for tenant in &mut settings.tenants {
        if tenant.access_token.is_some() {
            tenant.access_token = Some(MASK.to_string());
        }
    }
    toml::to_string_pretty(&settings).context("Failed to render configuration")
}

pub fn show_config(settings: &Settings) -> Result<()> {
    print!("{}", render_config(settings)?);
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Bootstrap and schedule every active tenant, then serve until SIGINT or
/// SIGTERM.
pub async fn run_daemon(ctx: &AppContext, initial_sync: bool) -> Result<()> {
    info!("tenant-rag daemon starting...");
    ctx.scheduler.start().await.context("Failed to start scheduler")?;

    let tenants = ctx
        .directory
        .active_tenants()
        .await
        .context("Failed to list tenants")?;
    if tenants.is_empty() {
        warn!("No active tenants configured");
    }

    for tenant in &tenants {
        let store_id = tenant.store_id.as_str();
        let result = if initial_sync {
            ctx.namespaces.on_connected(store_id).await.map(|_| ())
        } else {
            match ctx.namespaces.create_namespaces(store_id).await {
                Ok(_) => ctx.namespaces.schedule_periodic_sync(store_id).await,
                Err(e) => Err(e),
            }
        };
        match result {
            Ok(()) => info!(store_id = %store_id, "Tenant ready"),
            Err(e) => warn!(store_id = %store_id, error = %e, "Tenant startup failed"),
        }
    }

    info!(
        tenants = tenants.len(),
        jobs = ctx.scheduler.job_names().len(),
        "Daemon running"
    );
    shutdown_signal().await;

    if !ctx.namespaces.background_tasks().shutdown(SHUTDOWN_GRACE).await {
        warn!("Background tasks cancelled at shutdown");
    }
    ctx.scheduler
        .shutdown()
        .await
        .context("Failed to stop scheduler")?;

    let status = ctx.locks.status();
    if status.total_leases > 0 {
        warn!(leases = status.total_leases, "Leases still held at shutdown");
    }
    info!("tenant-rag daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}

pub async fn bootstrap(ctx: &AppContext, store_id: &str) -> Result<BootstrapReport> {
    let report = ctx
        .namespaces
        .create_namespaces(store_id)
        .await
        .with_context(|| format!("Failed to bootstrap store {store_id}"))?;
    Ok(report)
}

pub async fn sync(ctx: &AppContext, store_id: &str) -> Result<SyncResult> {
    bootstrap(ctx, store_id).await?;
    let result = ctx
        .namespaces
        .trigger_sync(store_id)
        .await
        .with_context(|| format!("Failed to sync store {store_id}"))?;
    Ok(result)
}

pub async fn search(
    ctx: &AppContext,
    store_id: &str,
    query: &str,
    role: AgentRole,
    top_k: Option<usize>,
    conversation: Option<String>,
) -> Result<RagAnswer> {
    if ctx.is_ephemeral() {
        info!(store_id = %store_id, "In-memory index, syncing before search");
        let result = sync(ctx, store_id).await?;
        if !result.success {
            warn!(store_id = %store_id, error = ?result.error, "Pre-search sync failed");
        }
    }

    let mut context = SearchContext::new(store_id, role);
    if let Some(conversation) = conversation {
        context = context.with_conversation(conversation);
    }
    let mut options = SearchOptions::default();
    if let Some(top_k) = top_k {
        options = options.with_top_k(top_k);
    }
    Ok(ctx.engine.search(query, &context, &options).await)
}

pub async fn delete(ctx: &AppContext, store_id: &str) -> Result<DeleteReport> {
    let report = ctx
        .namespaces
        .on_deleted(store_id)
        .await
        .with_context(|| format!("Failed to delete store {store_id}"))?;
    Ok(report)
}

pub fn show_locks(ctx: &AppContext, store: Option<&str>) -> Result<()> {
    match store {
        Some(store_id) => print_json(&ctx.locks.active_leases(store_id)),
        None => print_json(&ctx.locks.status()),
    }
}

pub async fn handle_bootstrap(ctx: &AppContext, store_id: &str) -> Result<()> {
    print_json(&bootstrap(ctx, store_id).await?)
}

pub async fn handle_sync(ctx: &AppContext, store_id: &str) -> Result<()> {
    let result = sync(ctx, store_id).await?;
    print_json(&result)?;
    if !result.success {
        anyhow::bail!(
            "Sync of store {store_id} failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

pub async fn handle_search(
    ctx: &AppContext,
    store_id: &str,
    query: &str,
    role: AgentRole,
    top_k: Option<usize>,
    conversation: Option<String>,
) -> Result<()> {
    print_json(&search(ctx, store_id, query, role, top_k, conversation).await?)
}

pub async fn handle_delete(ctx: &AppContext, store_id: &str) -> Result<()> {
    print_json(&delete(ctx, store_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::DEMO_STORE_ID;
    use rag_namespaces::NamespaceState;

    async fn offline() -> AppContext {
        let mut settings = Settings::default();
        settings.namespaces.creation_delay_ms = 0;
        AppContext::build(settings, true).await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sync_indexes_demo_store() {
        let ctx = offline().await;

        let result = sync(&ctx, DEMO_STORE_ID).await.unwrap();

        assert!(result.success);
        assert_eq!(result.documents_indexed, 7);
        assert_eq!(ctx.namespaces.namespace_state(DEMO_STORE_ID), NamespaceState::Indexed);
        assert_eq!(ctx.locks.status().total_leases, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_search_populates_ephemeral_index() {
        let ctx = offline().await;

        let answer = search(
            &ctx,
            DEMO_STORE_ID,
            "Which coffee beans do you have?",
            AgentRole::Product,
            Some(3),
            None,
        )
        .await
        .unwrap();

        assert!(!answer.is_fallback());
        assert!(!answer.sources.is_empty());
        assert!(answer.sources.len() <= 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sync_unknown_store_fails() {
        let ctx = offline().await;
        assert!(sync(&ctx, "nope").await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_after_bootstrap() {
        let ctx = offline().await;
        bootstrap(&ctx, DEMO_STORE_ID).await.unwrap();

        let report = delete(&ctx, DEMO_STORE_ID).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(ctx.namespaces.namespace_state(DEMO_STORE_ID), NamespaceState::Deleted);
    }

    #[test]
    fn test_load_settings_applies_log_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "log_level = \"warn\"\n").unwrap();

        let settings = load_settings(Some(path.to_str().unwrap()), None).unwrap();
        assert_eq!(settings.log_level, "warn");

        let settings = load_settings(Some(path.to_str().unwrap()), Some("trace")).unwrap();
        assert_eq!(settings.log_level, "trace");
    }

    #[test]
    fn test_render_config_masks_secrets() {
        let mut settings = Settings::default();
        settings.llm.api_key = Some("sk-live-123".into());
        settings.tenants.push(rag_types::TenantSeed {
            store_id: "42".into(),
            user_id: "owner-1".into(),
            platform_id: None,
            access_token: Some("tok-42".into()),
            is_active: true,
        });

        let rendered = render_config(&settings).unwrap();

        assert!(!rendered.contains("sk-live-123"));
        assert!(!rendered.contains("tok-42"));
        assert!(rendered.contains(MASK));

        let parsed: Settings = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.tenants[0].store_id, "42");
        assert_eq!(parsed.retrieval.top_k, settings.retrieval.top_k);
    }
}
