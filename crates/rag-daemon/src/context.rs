//! Composition root: builds every service from [`Settings`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use rag_embeddings::{ApiEmbedder, ApiEmbedderConfig, EmbeddingModel, HashingEmbedder};
use rag_engine::RagEngine;
use rag_llm::{ApiLanguageModel, ApiLanguageModelConfig, LanguageModel, MockLanguageModel};
use rag_locks::LockManager;
use rag_namespaces::NamespaceManager;
use rag_platform::{
    DirectoryCredentialResolver, FixtureConnector, HttpConnector, InMemoryTenantDirectory,
    PlatformConnector, TenantDirectory,
};
use rag_scheduler::{SchedulerConfig, SchedulerService};
use rag_types::{EmbeddingSettings, LlmSettings, Settings, VectorSettings};
use rag_vector::{HttpBackend, HttpBackendConfig, InMemoryBackend, NamespacedVectorStore, VectorBackend};
use tracing::info;

use crate::demo;

/// Every long-lived service of one daemon process.
pub struct AppContext {
    pub settings: Settings,
    pub engine: Arc<RagEngine>,
    pub locks: Arc<LockManager>,
    pub scheduler: Arc<SchedulerService>,
    pub namespaces: Arc<NamespaceManager>,
    pub directory: Arc<dyn TenantDirectory>,
}

impl AppContext {
    /// Wire the stack. `offline` swaps every external provider for its
    /// in-process counterpart and serves the demo store.
    pub async fn build(mut settings: Settings, offline: bool) -> Result<Self> {
        if offline {
            settings.embeddings.provider = "hashing".to_string();
            settings.vector.backend = "memory".to_string();
            settings.llm.provider = "mock".to_string();
        }

        let embedder = build_embedder(&settings.embeddings)?;
        let backend = build_vector_backend(&settings.vector)?;
        let llm = build_llm(&settings.llm)?;

        let mut directory = InMemoryTenantDirectory::from_seeds(&settings.tenants);
        let connector: Arc<dyn PlatformConnector> = if offline {
            directory = directory.with_tenant(demo::demo_tenant());
            Arc::new(
                FixtureConnector::new()
                    .with_store(demo::DEMO_STORE_ID, Arc::new(demo::demo_platform())),
            )
        } else {
            Arc::new(HttpConnector::new(
                settings.platform.base_url.clone(),
                Duration::from_secs(settings.platform.timeout_secs),
            ))
        };
        let directory: Arc<dyn TenantDirectory> = Arc::new(directory);

        let store = Arc::new(NamespacedVectorStore::new(
            backend,
            embedder,
            settings.retrieval.client_cache_capacity,
        ));
        let engine = Arc::new(
            RagEngine::new(
                store,
                llm,
                connector,
                Arc::new(DirectoryCredentialResolver::new(directory.clone())),
                directory.clone(),
            )
            .with_ingestion_settings(settings.ingestion.clone())
            .with_retrieval_settings(settings.retrieval.clone()),
        );

        let locks = Arc::new(LockManager::new(settings.locks.clone()));
        let scheduler = Arc::new(
            SchedulerService::new(SchedulerConfig::default())
                .await
                .context("Failed to create scheduler")?,
        );
        let namespaces = NamespaceManager::new(
            engine.clone(),
            locks.clone(),
            scheduler.clone(),
            settings.namespaces.clone(),
        );

        info!(
            embeddings = %settings.embeddings.provider,
            vector = %settings.vector.backend,
            llm = %settings.llm.provider,
            tenants = settings.tenants.len(),
            offline,
            "Services initialized"
        );

        Ok(Self {
            settings,
            engine,
            locks,
            scheduler,
            namespaces,
            directory,
        })
    }

    /// The index lives in this process only; one-shot commands must
    /// populate it before they can read anything back.
    pub fn is_ephemeral(&self) -> bool {
        self.settings.vector.backend == "memory"
    }
}

fn required_key(key: &Option<String>, section: &str) -> Result<String> {
    key.clone()
        .filter(|k| !k.is_empty())
        .with_context(|| format!("{section}.api_key is required (set TENANT_RAG_{}__API_KEY)", section.to_uppercase()))
}

pub fn build_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn EmbeddingModel>> {
    match settings.provider.as_str() {
        "hashing" => Ok(Arc::new(HashingEmbedder::new(settings.dimension))),
        "openai" => {
            let mut config = ApiEmbedderConfig::openai(
                required_key(&settings.api_key, "embeddings")?,
                settings.model.clone(),
                settings.dimension,
            );
            if let Some(url) = &settings.api_base_url {
                config = config.with_base_url(url.clone());
            }
            Ok(Arc::new(ApiEmbedder::new(config).context("Failed to create embedder")?))
        }
        other => bail!("Unknown embeddings provider: {other}"),
    }
}

pub fn build_vector_backend(settings: &VectorSettings) -> Result<Arc<dyn VectorBackend>> {
    match settings.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryBackend::new())),
        "http" => {
            let url = settings
                .url
                .clone()
                .context("vector.url is required for the http backend")?;
            let config = HttpBackendConfig::new(url, required_key(&settings.api_key, "vector")?);
            Ok(Arc::new(HttpBackend::new(config).context("Failed to create vector backend")?))
        }
        other => bail!("Unknown vector backend: {other}"),
    }
}

pub fn build_llm(settings: &LlmSettings) -> Result<Arc<dyn LanguageModel>> {
    let config = match settings.provider.as_str() {
        "mock" => return Ok(Arc::new(MockLanguageModel::new())),
        "openai" => ApiLanguageModelConfig::openai(
            required_key(&settings.api_key, "llm")?,
            settings.model.clone(),
        ),
        "anthropic" | "claude" => ApiLanguageModelConfig::claude(
            required_key(&settings.api_key, "llm")?,
            settings.model.clone(),
        ),
        other => bail!("Unknown llm provider: {other}"),
    };
    let mut config = config
        .with_timeout(Duration::from_secs(settings.timeout_secs))
        .with_max_retries(settings.max_retries);
    if let Some(url) = &settings.api_base_url {
        config = config.with_base_url(url.clone());
    }
    Ok(Arc::new(ApiLanguageModel::new(config).context("Failed to create language model")?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_providers_are_offline() {
        let settings = Settings::default();
        let embedder = build_embedder(&settings.embeddings).unwrap();
        assert_eq!(embedder.info().dimension, 384);
        assert!(build_vector_backend(&settings.vector).is_ok());
        assert_eq!(build_llm(&settings.llm).unwrap().model_name(), "mock");
    }

    #[test]
    fn test_api_providers_require_keys() {
        let embeddings = EmbeddingSettings {
            provider: "openai".into(),
            ..Default::default()
        };
        let err = build_embedder(&embeddings).err().unwrap();
        assert!(err.to_string().contains("embeddings.api_key"));

        let llm = LlmSettings {
            provider: "anthropic".into(),
            ..Default::default()
        };
        assert!(build_llm(&llm).is_err());

        let vector = VectorSettings {
            backend: "http".into(),
            ..Default::default()
        };
        let err = build_vector_backend(&vector).err().unwrap();
        assert!(err.to_string().contains("vector.url"));
    }

    #[test]
    fn test_unknown_provider() {
        let llm = LlmSettings {
            provider: "carrier-pigeon".into(),
            ..Default::default()
        };
        let err = build_llm(&llm).err().unwrap();
        assert!(err.to_string().contains("carrier-pigeon"));
    }

    #[tokio::test]
    async fn test_offline_context_serves_demo_store() {
        let ctx = AppContext::build(Settings::default(), true).await.unwrap();
        assert!(ctx.is_ephemeral());
        let record = ctx.directory.get_tenant(demo::DEMO_STORE_ID).await.unwrap().unwrap();
        assert!(record.is_active);
        assert_eq!(ctx.locks.status().total_leases, 0);
    }
}
