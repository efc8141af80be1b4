//! Deterministic embedder doubles for tests.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use async_trait::async_trait;

use tastemap_common::EngineError;

use crate::Embedder;

/// Deterministic pseudo-embedder: the vector is derived from the text bytes,
/// so identical input always encodes identically and distinct texts almost
/// always differ. Good enough for pipeline tests that only rely on the
/// determinism contract, not on semantic quality.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        (0..self.dim)
            .map(|i| {
                let mut hasher = DefaultHasher::new();
                text.hash(&mut hasher);
                i.hash(&mut hasher);
                let h = hasher.finish();
                // Map to [-1, 1]
                (h as f64 / u64::MAX as f64 * 2.0 - 1.0) as f32
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError> {
        Ok(self.encode(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EngineError> {
        Ok(texts.iter().map(|t| self.encode(t)).collect())
    }

    fn dim(&self) -> usize {
        self.dim
    }
}

/// Embedder with scripted vectors per exact text. Lets tests pin down the
/// cosine geometry instead of relying on hashed noise.
pub struct MapEmbedder {
    dim: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl MapEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            vectors: HashMap::new(),
        }
    }

    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    fn lookup(&self, text: &str) -> Result<Vec<f32>, EngineError> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| EngineError::ProviderPermanent(format!("No scripted vector for {text:?}")))
    }
}

#[async_trait]
impl Embedder for MapEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError> {
        self.lookup(text)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EngineError> {
        texts.iter().map(|t| self.lookup(t)).collect()
    }

    fn dim(&self) -> usize {
        self.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_embedder_is_deterministic() {
        let embedder = HashEmbedder::new(8);
        let a = embedder.embed("cozy italian restaurant").await.unwrap();
        let b = embedder.embed("cozy italian restaurant").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
    }

    #[tokio::test]
    async fn hash_embedder_differs_per_text() {
        let embedder = HashEmbedder::new(8);
        let a = embedder.embed("sushi").await.unwrap();
        let b = embedder.embed("pizza").await.unwrap();
        assert_ne!(a, b);
    }
}
