//! The request-facing pipeline: ingest, search, diagnose.
//!
//! [`MemoryService`] wires the chunker, the embedding provider, the dedup
//! pass, and the vector store together. It is stateless between requests —
//! the persisted rows are the only thing that survives a call.
//!
//! # Data flow
//!
//! ```text
//! store:  text ─► TextChunker ─► EmbeddingProvider ─► dedupe ─► VectorStore
//! search: query ─► EmbeddingProvider ─► VectorStore (cosine top-k)
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use chunksmith::config::MemoryConfig;
//! use chunksmith::service::MemoryService;
//! use chunksmith::stores::SqliteMemoryStore;
//!
//! let config = MemoryConfig::from_env()?;
//! let store = SqliteMemoryStore::open("memory.db", config.dimension).await?;
//! let service = MemoryService::builder()
//!     .config(config)
//!     .store(Arc::new(store))
//!     .build()?;
//!
//! service.store_document("doc-1", text, Metadata::new()).await?;
//! let hits = service.search("what did we learn?", 5, None, None).await?;
//! ```

use std::sync::Arc;

use crate::chunker::TextChunker;
use crate::config::MemoryConfig;
use crate::dedup;
use crate::diagnostics::{DiagnosticsReport, DimensionReport};
use crate::embeddings::{self, EmbeddingProvider};
use crate::stores::VectorStore;
use crate::types::{ChunkRecord, MemoryError, Metadata, ScoredChunk, StoreReceipt};

/// Orchestrates the chunk-ingestion and retrieval pipeline.
pub struct MemoryService {
    config: MemoryConfig,
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    chunker: TextChunker,
}

impl MemoryService {
    pub fn builder() -> MemoryServiceBuilder {
        MemoryServiceBuilder::default()
    }

    /// The configuration this service was built with.
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Chunk, embed, deduplicate, and persist `text` under `doc_id`,
    /// atomically replacing any prior chunk set for that document.
    ///
    /// Whitespace-only text clears the document's rows and stores nothing;
    /// that makes re-submitting a document the single update primitive and
    /// an empty submission an idempotent delete.
    pub async fn store_document(
        &self,
        doc_id: &str,
        text: &str,
        metadata: Metadata,
    ) -> Result<StoreReceipt, MemoryError> {
        if doc_id.trim().is_empty() {
            return Err(MemoryError::Validation("doc_id must not be empty".into()));
        }

        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            self.store.replace_document(doc_id, Vec::new()).await?;
            tracing::info!(doc_id, "stored empty document (cleared prior rows)");
            return Ok(StoreReceipt {
                doc_id: doc_id.to_string(),
                chunks_stored: 0,
                chunks_deduped: 0,
            });
        }

        let vectors = self.provider.embed_batch(&chunks).await?;
        if vectors.len() != chunks.len() {
            return Err(MemoryError::Provider(format!(
                "provider returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }
        self.check_vector_widths(&vectors)?;

        let chunked = chunks.len();
        let pairs: Vec<(String, Vec<f32>)> = chunks.into_iter().zip(vectors).collect();
        let survivors = if self.config.dedup_enabled {
            dedup::dedupe(pairs, self.config.dedup_threshold)
        } else {
            pairs
        };
        let deduped = chunked - survivors.len();

        let records: Vec<ChunkRecord> = survivors
            .into_iter()
            .enumerate()
            .map(|(ordinal, (text, embedding))| {
                ChunkRecord::new(doc_id, ordinal, text, embedding, metadata.clone())
            })
            .collect();

        let stored = self.store.replace_document(doc_id, records).await?;
        tracing::info!(doc_id, stored, deduped, "stored document");

        Ok(StoreReceipt {
            doc_id: doc_id.to_string(),
            chunks_stored: stored,
            chunks_deduped: deduped,
        })
    }

    /// Embed `query` and return the `top_k` most cosine-similar stored
    /// chunks, best first, optionally restricted by an exact-match metadata
    /// `filter` (conjunctive) and/or a `doc_id`.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&Metadata>,
        doc_id: Option<&str>,
    ) -> Result<Vec<ScoredChunk>, MemoryError> {
        if query.trim().is_empty() {
            return Err(MemoryError::Validation("query must not be empty".into()));
        }
        if top_k == 0 {
            return Err(MemoryError::Validation("top_k must be positive".into()));
        }

        let mut vectors = self.provider.embed_batch(&[query.to_string()]).await?;
        let query_vector = vectors.pop().ok_or_else(|| {
            MemoryError::Provider("provider returned no vector for the query".into())
        })?;
        self.check_vector_widths(std::slice::from_ref(&query_vector))?;

        let results = self
            .store
            .search(&query_vector, top_k, filter, doc_id)
            .await?;
        tracing::debug!(top_k, hits = results.len(), "search complete");
        Ok(results)
    }

    /// Probe the active provider with one embedding call and compare the
    /// produced vector length against the configured dimension and the
    /// storage column's declared width.
    ///
    /// Advisory only: the check never gates store/search and never corrects
    /// anything. It costs one provider call, so it is invoked explicitly (at
    /// startup or from a status query) rather than per request.
    pub async fn check_dimensions(&self) -> Result<DimensionReport, MemoryError> {
        let probe = self
            .provider
            .embed_batch(&["dimension probe".to_string()])
            .await?;
        let embedding_dim = probe.first().map(Vec::len).unwrap_or(0);
        let configured_dim = self.config.dimension;
        let storage_dim = self.store.dimension().await?;

        Ok(DimensionReport {
            embedding_dim,
            configured_dim,
            storage_dim,
            consistent: embedding_dim == configured_dim && configured_dim == storage_dim,
        })
    }

    /// The dimension report plus a non-secret configuration echo.
    pub async fn diagnostics(&self) -> Result<DiagnosticsReport, MemoryError> {
        let dimensions = self.check_dimensions().await?;
        Ok(DiagnosticsReport {
            dimensions,
            provider: self.provider.provider_name().to_string(),
            model: self.provider.model_name().to_string(),
            chunk_size: self.config.chunk_size,
            chunk_overlap: self.config.chunk_overlap,
            dedup_enabled: self.config.dedup_enabled,
            dedup_threshold: self.config.dedup_threshold,
        })
    }

    fn check_vector_widths(&self, vectors: &[Vec<f32>]) -> Result<(), MemoryError> {
        for vector in vectors {
            if vector.len() != self.config.dimension {
                return Err(MemoryError::Provider(format!(
                    "provider produced a {}-dimensional vector, configured dimension is {}",
                    vector.len(),
                    self.config.dimension
                )));
            }
        }
        Ok(())
    }
}

/// Builder for [`MemoryService`].
///
/// A store is required. The provider defaults to whatever the config
/// selects; supplying one explicitly (e.g. a canned mock) overrides that.
#[derive(Default)]
pub struct MemoryServiceBuilder {
    config: Option<MemoryConfig>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Arc<dyn VectorStore>>,
}

impl MemoryServiceBuilder {
    #[must_use]
    pub fn config(mut self, config: MemoryConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<MemoryService, MemoryError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let store = self.store.ok_or_else(|| {
            MemoryError::Configuration("memory service requires a vector store".into())
        })?;
        let provider = match self.provider {
            Some(provider) => provider,
            None => embeddings::from_config(&config)?,
        };
        let chunker = TextChunker::new(config.chunk_size, config.chunk_overlap);

        Ok(MemoryService {
            config,
            provider,
            store,
            chunker,
        })
    }
}
