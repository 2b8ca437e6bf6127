//! Pinecone-style REST vector backend.
//!
//! Chunk text and metadata travel as flat record metadata: `text`,
//! `data_type`, `store_id`, `source`, `timestamp`, plus each structured
//! field. Non-scalar fields are stored as JSON strings.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rag_embeddings::Embedding;
use rag_types::{ChunkMetadata, DataType, DocumentChunk};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::backend::{ScoredChunk, VectorBackend, VectorRecord};
use crate::error::VectorError;

const RESERVED_KEYS: [&str; 5] = ["text", "data_type", "store_id", "source", "timestamp"];

/// Connection settings for [`HttpBackend`].
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// Index host, e.g. "https://my-index-abc123.svc.pinecone.io"
    pub url: String,
    pub api_key: SecretString,
    pub timeout: Duration,
}

impl HttpBackendConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: SecretString::from(api_key.into()),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
struct WireVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: Map<String, Value>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<WireVector<'a>>,
    namespace: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<WireMatch>,
}

#[derive(Deserialize)]
struct WireMatch {
    id: String,
    score: f32,
    #[serde(default)]
    metadata: Map<String, Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest<'a> {
    namespace: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ids: Option<&'a [String]>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    delete_all: bool,
}

/// Remote vector backend speaking the Pinecone data-plane API.
pub struct HttpBackend {
    client: Client,
    config: HttpBackendConfig,
}

impl HttpBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self, VectorError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| VectorError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.url.trim_end_matches('/'), path)
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, VectorError> {
        self.client
            .post(self.endpoint(path))
            .header("Api-Key", self.config.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| VectorError::Http(e.to_string()))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, VectorError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(VectorError::Backend(format!("{}: {}", status, body)))
}

fn encode_metadata(chunk: &DocumentChunk) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in &chunk.metadata.fields {
        let flat = match value {
            Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
            Value::Null => continue,
            other => other.clone(),
        };
        map.insert(key.clone(), flat);
    }
    map.insert("text".into(), Value::String(chunk.content.clone()));
    map.insert(
        "data_type".into(),
        Value::String(chunk.metadata.data_type.to_string()),
    );
    map.insert("store_id".into(), Value::String(chunk.metadata.store_id.clone()));
    map.insert("source".into(), Value::String(chunk.metadata.source.clone()));
    map.insert(
        "timestamp".into(),
        Value::String(chunk.metadata.timestamp.to_rfc3339()),
    );
    map
}

fn decode_match(m: WireMatch) -> Result<ScoredChunk, VectorError> {
    let mut meta = m.metadata;
    let text = take_string(&mut meta, "text")?;
    let data_type: DataType = take_string(&mut meta, "data_type")?
        .parse()
        .map_err(|e: rag_types::TypesError| VectorError::Decode(e.to_string()))?;
    let store_id = take_string(&mut meta, "store_id")?;
    let source = take_string(&mut meta, "source")?;
    let timestamp = take_string(&mut meta, "timestamp")
        .ok()
        .and_then(|ts| DateTime::parse_from_rfc3339(&ts).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    let mut metadata = ChunkMetadata::new(data_type, store_id, source);
    metadata.timestamp = timestamp;
    for (key, value) in meta {
        if !RESERVED_KEYS.contains(&key.as_str()) {
            metadata.fields.insert(key, value);
        }
    }

    Ok(ScoredChunk::new(DocumentChunk::new(m.id, text, metadata), m.score))
}

fn take_string(meta: &mut Map<String, Value>, key: &str) -> Result<String, VectorError> {
    match meta.remove(key) {
        Some(Value::String(s)) => Ok(s),
        _ => Err(VectorError::Decode(format!("missing metadata key: {key}"))),
    }
}

#[async_trait]
impl VectorBackend for HttpBackend {
    async fn upsert(
        &self,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> Result<usize, VectorError> {
        if records.is_empty() {
            return Ok(0);
        }
        let vectors = records
            .iter()
            .map(|r| WireVector {
                id: r.id(),
                values: &r.embedding.values,
                metadata: encode_metadata(&r.chunk),
            })
            .collect();
        let request = UpsertRequest { vectors, namespace };

        check_status(self.post("/vectors/upsert", &request).await?).await?;
        debug!(namespace, count = records.len(), "Upserted records");
        Ok(records.len())
    }

    async fn query(
        &self,
        namespace: &str,
        embedding: &Embedding,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, VectorError> {
        let request = QueryRequest {
            namespace,
            vector: &embedding.values,
            top_k,
            include_metadata: true,
        };
        let response = check_status(self.post("/query", &request).await?).await?;
        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| VectorError::Decode(e.to_string()))?;

        let mut out = Vec::with_capacity(parsed.matches.len());
        for m in parsed.matches {
            let id = m.id.clone();
            match decode_match(m) {
                Ok(scored) => out.push(scored),
                Err(e) => warn!(namespace, id = %id, error = %e, "Skipping undecodable match"),
            }
        }
        Ok(out)
    }

    async fn delete(&self, namespace: &str, ids: &[String]) -> Result<(), VectorError> {
        if ids.is_empty() {
            return Ok(());
        }
        let request = DeleteRequest {
            namespace,
            ids: Some(ids),
            delete_all: false,
        };
        check_status(self.post("/vectors/delete", &request).await?).await?;
        Ok(())
    }

    async fn delete_all(&self, namespace: &str) -> Result<(), VectorError> {
        let request = DeleteRequest {
            namespace,
            ids: None,
            delete_all: true,
        };
        let response = self.post("/vectors/delete", &request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(namespace, "Namespace already absent");
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }
}
