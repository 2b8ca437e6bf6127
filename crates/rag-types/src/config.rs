//! Configuration loading for tenant-rag.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `~/.config/tenant-rag/config.toml`.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::TypesError;
use crate::namespace::DataType;

/// Lease timeouts and polling for the lock manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockSettings {
    #[serde(default = "default_background_timeout")]
    pub background_sync_timeout_secs: u64,

    #[serde(default = "default_manual_timeout")]
    pub manual_sync_timeout_secs: u64,

    #[serde(default = "default_reconnection_timeout")]
    pub reconnection_timeout_secs: u64,

    #[serde(default = "default_deletion_timeout")]
    pub deletion_timeout_secs: u64,

    /// Interval between availability checks in `wait_for_availability`.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_background_timeout() -> u64 {
    120
}

fn default_manual_timeout() -> u64 {
    180
}

fn default_reconnection_timeout() -> u64 {
    300
}

fn default_deletion_timeout() -> u64 {
    120
}

fn default_poll_interval() -> u64 {
    500
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            background_sync_timeout_secs: default_background_timeout(),
            manual_sync_timeout_secs: default_manual_timeout(),
            reconnection_timeout_secs: default_reconnection_timeout(),
            deletion_timeout_secs: default_deletion_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

/// Namespace bootstrap and periodic sync settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceSettings {
    /// Bootstrap fails unless at least one of these types succeeded.
    #[serde(default = "default_essential_types")]
    pub essential_types: Vec<DataType>,

    /// Bootstrap fails unless at least this many types succeeded.
    #[serde(default = "default_min_successful_types")]
    pub min_successful_types: usize,

    /// Pause between sequential namespace creations (upstream rate limits).
    #[serde(default = "default_creation_delay")]
    pub creation_delay_ms: u64,

    /// Interval of the per-tenant periodic sync.
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,

    /// Max random delay before each periodic sync run.
    #[serde(default = "default_sync_jitter")]
    pub sync_jitter_secs: u64,

    /// How long a user-requested sync waits for a busy tenant.
    #[serde(default = "default_manual_sync_wait")]
    pub manual_sync_wait_ms: u64,

    /// Query used to check whether a namespace is functional.
    #[serde(default = "default_inspection_query")]
    pub inspection_query: String,
}

fn default_essential_types() -> Vec<DataType> {
    vec![DataType::Store, DataType::Products]
}

fn default_min_successful_types() -> usize {
    4
}

fn default_creation_delay() -> u64 {
    200
}

fn default_sync_interval() -> u64 {
    300
}

fn default_sync_jitter() -> u64 {
    30
}

fn default_manual_sync_wait() -> u64 {
    2_000
}

fn default_inspection_query() -> String {
    "store information".to_string()
}

impl Default for NamespaceSettings {
    fn default() -> Self {
        Self {
            essential_types: default_essential_types(),
            min_successful_types: default_min_successful_types(),
            creation_delay_ms: default_creation_delay(),
            sync_interval_secs: default_sync_interval(),
            sync_jitter_secs: default_sync_jitter(),
            manual_sync_wait_ms: default_manual_sync_wait(),
            inspection_query: default_inspection_query(),
        }
    }
}

/// Upstream ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionSettings {
    #[serde(default = "default_page_size")]
    pub product_page_size: u32,

    #[serde(default = "default_page_size")]
    pub order_page_size: u32,

    #[serde(default = "default_page_size")]
    pub customer_page_size: u32,

    /// Timeout for the platform connectivity test.
    #[serde(default = "default_connectivity_timeout")]
    pub connectivity_timeout_secs: u64,

    /// Records longer than this are split into several chunks.
    #[serde(default = "default_max_chunk_tokens")]
    pub max_chunk_tokens: usize,
}

fn default_page_size() -> u32 {
    50
}

fn default_connectivity_timeout() -> u64 {
    10
}

fn default_max_chunk_tokens() -> usize {
    512
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            product_page_size: default_page_size(),
            order_page_size: default_page_size(),
            customer_page_size: default_page_size(),
            connectivity_timeout_secs: default_connectivity_timeout(),
            max_chunk_tokens: default_max_chunk_tokens(),
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Per-namespace minimum similarity; applied before merging.
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Mean score is multiplied by this before clamping to [0.1, 0.95].
    #[serde(default = "default_confidence_scale")]
    pub confidence_scale: f32,

    /// Bound on cached `(store_id, namespace)` client handles.
    #[serde(default = "default_client_cache_capacity")]
    pub client_cache_capacity: usize,

    /// Bound on cached conversations.
    #[serde(default = "default_conversation_cache_capacity")]
    pub conversation_cache_capacity: usize,

    /// Turns of history kept per conversation.
    #[serde(default = "default_conversation_turns")]
    pub conversation_turns: usize,
}

fn default_top_k() -> usize {
    10
}

fn default_min_score() -> f32 {
    0.15
}

fn default_confidence_scale() -> f32 {
    1.2
}

fn default_client_cache_capacity() -> usize {
    256
}

fn default_conversation_cache_capacity() -> usize {
    512
}

fn default_conversation_turns() -> usize {
    6
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: default_min_score(),
            confidence_scale: default_confidence_scale(),
            client_cache_capacity: default_client_cache_capacity(),
            conversation_cache_capacity: default_conversation_cache_capacity(),
            conversation_turns: default_conversation_turns(),
        }
    }
}

impl RetrievalSettings {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.top_k == 0 {
            return Err("top_k must be > 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(format!("min_score must be 0.0-1.0, got {}", self.min_score));
        }
        if self.confidence_scale <= 0.0 {
            return Err("confidence_scale must be > 0".to_string());
        }
        Ok(())
    }
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// "hashing" (offline) or "openai"
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// API key (loaded from env var, not stored in config file)
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub api_base_url: Option<String>,
}

fn default_embedding_provider() -> String {
    "hashing".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimension() -> usize {
    384
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            api_key: None,
            api_base_url: None,
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// "mock", "openai" or "anthropic"
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub api_base_url: Option<String>,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_llm_retries")]
    pub max_retries: u32,
}

fn default_llm_provider() -> String {
    "mock".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_llm_retries() -> u32 {
    3
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            api_key: None,
            api_base_url: None,
            timeout_secs: default_llm_timeout(),
            max_retries: default_llm_retries(),
        }
    }
}

/// Vector database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSettings {
    /// "memory" or "http"
    #[serde(default = "default_vector_backend")]
    pub backend: String,

    /// Index host for the HTTP backend
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_vector_backend() -> String {
    "memory".to_string()
}

impl Default for VectorSettings {
    fn default() -> Self {
        Self {
            backend: default_vector_backend(),
            url: None,
            api_key: None,
        }
    }
}

/// Upstream e-commerce platform settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformSettings {
    #[serde(default = "default_platform_url")]
    pub base_url: String,

    #[serde(default = "default_platform_timeout")]
    pub timeout_secs: u64,
}

fn default_platform_url() -> String {
    "https://api.salla.dev/admin/v2".to_string()
}

fn default_platform_timeout() -> u64 {
    30
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            base_url: default_platform_url(),
            timeout_secs: default_platform_timeout(),
        }
    }
}

/// Static tenant record used to seed the tenant directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantSeed {
    pub store_id: String,
    pub user_id: String,
    #[serde(default)]
    pub platform_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub locks: LockSettings,

    #[serde(default)]
    pub namespaces: NamespaceSettings,

    #[serde(default)]
    pub ingestion: IngestionSettings,

    #[serde(default)]
    pub retrieval: RetrievalSettings,

    #[serde(default)]
    pub embeddings: EmbeddingSettings,

    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub vector: VectorSettings,

    #[serde(default)]
    pub platform: PlatformSettings,

    #[serde(default)]
    pub tenants: Vec<TenantSeed>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            locks: LockSettings::default(),
            namespaces: NamespaceSettings::default(),
            ingestion: IngestionSettings::default(),
            retrieval: RetrievalSettings::default(),
            embeddings: EmbeddingSettings::default(),
            llm: LlmSettings::default(),
            vector: VectorSettings::default(),
            platform: PlatformSettings::default(),
            tenants: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/tenant-rag/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (TENANT_RAG_*, nested keys joined by `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, TypesError> {
        let config_dir = ProjectDirs::from("", "", "tenant-rag")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("retrieval.top_k", default_top_k() as i64)
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("namespaces.sync_interval_secs", default_sync_interval() as i64)
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("embeddings.provider", default_embedding_provider())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("llm.provider", default_llm_provider())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("vector.backend", default_vector_backend())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: TENANT_RAG_LOG_LEVEL, TENANT_RAG_RETRIEVAL__TOP_K, ...
        builder = builder.add_source(
            Environment::with_prefix("TENANT_RAG")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| TypesError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| TypesError::Config(e.to_string()))?;

        settings.retrieval.validate().map_err(TypesError::Config)?;
        Ok(settings)
    }
}
