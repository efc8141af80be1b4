//! Embedding provider.
//!
//! The engine aggregates and scores vectors through the `Embedder` trait;
//! `OpenAiEmbedder` is the production implementation. Encoding is
//! deterministic for identical input and every vector in a deployment shares
//! one dimension.

pub mod openai;
pub mod testing;

use async_trait::async_trait;

use tastemap_common::EngineError;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError>;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EngineError>;

    /// Fixed vector width for this deployment.
    fn dim(&self) -> usize;
}

pub use openai::OpenAiEmbedder;
