//! Core data types shared across the ingestion and retrieval pipeline.
//!
//! Everything that crosses a component seam lives here: the persisted
//! [`ChunkRecord`], the restricted [`Metadata`] mapping used for equality
//! filtering, the result/receipt types returned to callers, and the
//! [`MemoryError`] taxonomy.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A metadata value. The set of shapes is deliberately closed so that
/// exact-match filtering stays well-defined: strings, numbers, and booleans
/// compare by value, nothing else is representable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::Text(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::Text(value)
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        MetaValue::Number(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        MetaValue::Number(value as f64)
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        MetaValue::Flag(value)
    }
}

/// Caller-supplied metadata attached to every chunk of a document.
///
/// A `BTreeMap` keeps serialization order deterministic, which in turn keeps
/// stored JSON stable across re-ingestions of identical input.
pub type Metadata = BTreeMap<String, MetaValue>;

/// A chunk as persisted in the vector store: the unit of storage and
/// retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Surrogate identifier, assigned at insertion time and immutable.
    pub id: String,
    /// Caller-supplied document identifier. Many chunks share one `doc_id`;
    /// re-ingesting a `doc_id` replaces all of them atomically.
    pub doc_id: String,
    /// Zero-based position within the document's surviving chunk sequence.
    /// Informational only; retrieval ordering never consults it.
    pub ordinal: usize,
    /// The literal chunk text, non-empty and bounded by the configured
    /// chunk size.
    pub text: String,
    /// Fixed-length embedding vector. Its length must equal the store's
    /// declared dimension for every record.
    pub embedding: Vec<f32>,
    /// Open key/value metadata used only for exact-match filtering.
    pub metadata: Metadata,
    /// Insertion timestamp.
    pub created_at: DateTime<Utc>,
}

impl ChunkRecord {
    /// Build a record for a freshly chunked piece of text with a v4 UUID.
    pub fn new(
        doc_id: impl Into<String>,
        ordinal: usize,
        text: impl Into<String>,
        embedding: Vec<f32>,
        metadata: Metadata,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            doc_id: doc_id.into(),
            ordinal,
            text: text.into(),
            embedding,
            metadata,
            created_at: Utc::now(),
        }
    }
}

/// One ranked search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub text: String,
    /// Cosine similarity to the query vector, higher is closer.
    pub score: f32,
    pub doc_id: String,
    pub metadata: Metadata,
}

/// Outcome of a store request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreReceipt {
    pub doc_id: String,
    /// Chunks actually persisted, after deduplication.
    pub chunks_stored: usize,
    /// Chunks dropped by the deduplication pass.
    pub chunks_deduped: usize,
}

/// Errors surfaced by the pipeline. Every variant is terminal for the
/// current request; nothing is retried or downgraded internally.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Missing or empty required input (`doc_id`, `query`, zero `top_k`).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The embedding backend was unreachable or returned malformed output.
    #[error("embedding provider error: {0}")]
    Provider(String),

    /// The underlying persistence failed; no partial insert took place.
    #[error("storage error: {0}")]
    Storage(String),

    /// Invalid or inconsistent configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}
