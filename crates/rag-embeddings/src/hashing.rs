//! Deterministic feature-hashing embedder.
//!
//! Maps each content word to a signed bucket of a fixed-size vector. Texts
//! sharing vocabulary get high cosine similarity, which is enough for
//! offline deployments and makes retrieval tests reproducible.

use async_trait::async_trait;

use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel, ModelInfo};

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "do", "does", "for", "from", "have", "has",
    "how", "i", "in", "is", "it", "me", "my", "of", "on", "or", "our", "the", "this", "to", "we",
    "what", "which", "who", "with", "you", "your",
];

/// Offline embedder based on the hashing trick.
pub struct HashingEmbedder {
    info: ModelInfo,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            info: ModelInfo {
                name: "feature-hashing".to_string(),
                dimension: dimension.max(1),
            },
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut values = vec![0.0f32; self.info.dimension];
        for token in tokenize(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.info.dimension as u64) as usize;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            values[bucket] += sign;
        }
        values
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl EmbeddingModel for HashingEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        Ok(Embedding::new(self.vectorize(text)))
    }
}

/// Lowercase, split on non-alphanumerics, drop stopwords, strip plurals.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .map(|w| {
            if w.len() > 3 && w.ends_with('s') && !w.ends_with("ss") {
                w[..w.len() - 1].to_string()
            } else {
                w
            }
        })
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}
