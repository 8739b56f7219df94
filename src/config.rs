//! Process-wide pipeline configuration.
//!
//! [`MemoryConfig`] is constructed once at startup (either programmatically or
//! from the environment) and passed to each component constructor. Nothing in
//! the pipeline mutates it afterwards.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::MemoryError;

/// Which embedding backend to talk to. A startup-time choice; callers only
/// ever see the [`crate::embeddings::EmbeddingProvider`] trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// OpenAI-compatible `/embeddings` endpoint.
    OpenAi,
    /// Local Ollama daemon (`/api/embed`).
    Ollama,
    /// Deterministic in-process vectors, for tests and offline runs.
    Mock,
}

impl FromStr for EmbeddingBackend {
    type Err = MemoryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            "mock" => Ok(Self::Mock),
            other => Err(MemoryError::Configuration(format!(
                "unsupported embedding provider '{other}' (expected openai, ollama, or mock)"
            ))),
        }
    }
}

impl EmbeddingBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
            Self::Mock => "mock",
        }
    }
}

/// Immutable configuration for the whole pipeline.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Embedding backend selector.
    pub provider: EmbeddingBackend,
    /// Model identifier passed to the backend.
    pub model: String,
    /// Expected embedding vector length. Must match what the provider
    /// actually produces and what the store column declares.
    pub dimension: usize,
    /// Base URL for HTTP backends (`https://api.openai.com/v1`,
    /// `http://localhost:11434`, a mock server in tests).
    pub api_base: Option<String>,
    /// Bearer token for the OpenAI backend. Never echoed by diagnostics.
    pub api_key: Option<String>,
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Trailing context re-included at the start of the next chunk.
    pub chunk_overlap: usize,
    /// Whether the greedy dedup pass runs at all.
    pub dedup_enabled: bool,
    /// Cosine similarity at or above which a chunk is dropped as a
    /// near-duplicate. Must sit in (0, 1].
    pub dedup_threshold: f32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Ollama,
            model: "nomic-embed-text".to_string(),
            dimension: 768,
            api_base: None,
            api_key: None,
            chunk_size: 800,
            chunk_overlap: 150,
            dedup_enabled: true,
            dedup_threshold: 0.95,
        }
    }
}

impl MemoryConfig {
    /// Read configuration from the environment, falling back to defaults for
    /// anything unset. Loads `.env` first when present.
    pub fn from_env() -> Result<Self, MemoryError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let provider = match std::env::var("EMBEDDING_PROVIDER") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.provider,
        };

        let config = Self {
            provider,
            model: std::env::var("EMBEDDING_MODEL_NAME").unwrap_or(defaults.model),
            dimension: env_parse("EMBEDDING_DIMENSION", defaults.dimension)?,
            api_base: std::env::var("EMBEDDING_API_BASE").ok(),
            api_key: std::env::var("EMBEDDING_API_KEY").ok(),
            chunk_size: env_parse("CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: env_parse("CHUNK_OVERLAP", defaults.chunk_overlap)?,
            dedup_enabled: env_parse("DEDUP_ENABLED", defaults.dedup_enabled)?,
            dedup_threshold: env_parse("DEDUP_THRESHOLD", defaults.dedup_threshold)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the internal consistency of this configuration.
    pub fn validate(&self) -> Result<(), MemoryError> {
        if self.model.trim().is_empty() {
            return Err(MemoryError::Configuration(
                "embedding model name must not be empty".into(),
            ));
        }
        if self.dimension == 0 {
            return Err(MemoryError::Configuration(
                "embedding dimension must be positive".into(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(MemoryError::Configuration(
                "chunk size must be positive".into(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(MemoryError::Configuration(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if !(self.dedup_threshold > 0.0 && self.dedup_threshold <= 1.0) {
            return Err(MemoryError::Configuration(format!(
                "dedup threshold must be in (0, 1], got {}",
                self.dedup_threshold
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_provider(mut self, provider: EmbeddingBackend) -> Self {
        self.provider = provider;
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_chunking(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_overlap = chunk_overlap;
        self
    }

    #[must_use]
    pub fn with_dedup(mut self, enabled: bool, threshold: f32) -> Self {
        self.dedup_enabled = enabled;
        self.dedup_threshold = threshold;
        self
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> Result<T, MemoryError> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| {
            MemoryError::Configuration(format!("could not parse {name}='{raw}'"))
        }),
        Err(_) => Ok(default),
    }
}
