//! # chunksmith
//!
//! Chunk ingestion and cosine-similarity retrieval for text memory stores.
//!
//! Free text goes in one end; bounded, boundary-aware chunks come out the
//! other, embedded, deduplicated, and persisted under a caller-supplied
//! document id. Retrieval embeds a query and ranks the stored chunks by
//! cosine similarity under optional exact-match metadata filters.
//!
//! ```text
//! raw text ──► chunker::TextChunker ──► [chunks]
//!                                          │
//!                        embeddings::EmbeddingProvider (openai/ollama/mock)
//!                                          │
//!                                [chunk, vector] pairs
//!                                          │
//!                                   dedup::dedupe ──► survivors
//!                                          │
//!                      stores::VectorStore::replace_document (atomic)
//!
//! query ──► EmbeddingProvider ──► stores::VectorStore::search ──► top-k hits
//! ```
//!
//! Re-ingesting a `doc_id` fully replaces its prior chunk set inside one
//! transaction; that replace is the system's only update primitive. The
//! embedding dimension is a store-wide invariant, cross-checked by
//! [`service::MemoryService::check_dimensions`] against the configuration,
//! the live provider, and the storage column.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use chunksmith::config::MemoryConfig;
//! use chunksmith::service::MemoryService;
//! use chunksmith::stores::SqliteMemoryStore;
//! use chunksmith::types::Metadata;
//!
//! let config = MemoryConfig::from_env()?;
//! let store = SqliteMemoryStore::open("memory.db", config.dimension).await?;
//! let service = MemoryService::builder()
//!     .config(config)
//!     .store(Arc::new(store))
//!     .build()?;
//!
//! let receipt = service
//!     .store_document("notes-2024", "First fact. Second fact.", Metadata::new())
//!     .await?;
//! let hits = service.search("second", 5, None, None).await?;
//! ```

pub mod chunker;
pub mod config;
pub mod dedup;
pub mod diagnostics;
pub mod embeddings;
pub mod service;
pub mod stores;
pub mod types;

pub use chunker::TextChunker;
pub use config::{EmbeddingBackend, MemoryConfig};
pub use diagnostics::{DiagnosticsReport, DimensionReport};
pub use embeddings::{EmbeddingProvider, MockEmbeddingProvider};
pub use service::{MemoryService, MemoryServiceBuilder};
pub use stores::{SqliteMemoryStore, VectorStore};
pub use types::{ChunkRecord, MemoryError, MetaValue, Metadata, ScoredChunk, StoreReceipt};
