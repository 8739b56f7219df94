//! Uniform interface over interchangeable embedding backends.
//!
//! The pipeline only ever talks to [`EmbeddingProvider`]; which backend sits
//! behind it is a startup-time configuration choice made by [`from_config`].
//! Adding a backend means adding a variant to
//! [`crate::config::EmbeddingBackend`] and a constructor arm here — never
//! runtime type inspection.
//!
//! # Contract
//!
//! `embed_batch` is position-preserving: result `i` embeds input `i`. A whole
//! store request's chunks go out as one batch to bound latency; batching is
//! an optimization, so per-item calls must produce identical vectors. Any
//! transport failure or malformed response (wrong vector count, wrong
//! payload shape) is a [`MemoryError::Provider`] and fails the request — no
//! partial embeddings are ever returned.

pub mod mock;
pub mod ollama;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{EmbeddingBackend, MemoryConfig};
use crate::types::MemoryError;

pub use mock::MockEmbeddingProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// Capability interface every embedding backend implements.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed all texts in one backend call, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MemoryError>;

    /// The vector length this provider/model is expected to produce.
    fn declared_dimension(&self) -> usize;

    /// Stable backend identifier (`openai`, `ollama`, `mock`).
    fn provider_name(&self) -> &'static str;

    /// The model identifier this provider was configured with.
    fn model_name(&self) -> &str;
}

/// Build the provider selected by `config`.
pub fn from_config(config: &MemoryConfig) -> Result<Arc<dyn EmbeddingProvider>, MemoryError> {
    let provider: Arc<dyn EmbeddingProvider> = match config.provider {
        EmbeddingBackend::OpenAi => Arc::new(OpenAiProvider::new(
            config.api_key.clone().ok_or_else(|| {
                MemoryError::Configuration(
                    "openai provider requires EMBEDDING_API_KEY".into(),
                )
            })?,
            config
                .api_base
                .clone()
                .unwrap_or_else(|| openai::DEFAULT_API_BASE.to_string()),
            config.model.clone(),
            config.dimension,
        )?),
        EmbeddingBackend::Ollama => Arc::new(OllamaProvider::new(
            config
                .api_base
                .clone()
                .unwrap_or_else(|| ollama::DEFAULT_API_BASE.to_string()),
            config.model.clone(),
            config.dimension,
        )?),
        EmbeddingBackend::Mock => Arc::new(MockEmbeddingProvider::new(config.dimension)),
    };
    Ok(provider)
}
