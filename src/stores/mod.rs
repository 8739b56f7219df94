//! Storage backends for chunk records and their embeddings.
//!
//! The pipeline consumes storage through the [`VectorStore`] trait: a
//! capability that keeps rows keyed by id with a fixed-width vector column,
//! ranks by cosine distance, and filters on a JSON-like metadata field. The
//! shipped implementation is [`sqlite::SqliteMemoryStore`] (SQLite with
//! vector search via `sqlite-vec`); other engines (pgvector, Redis) would
//! slot in behind the same trait.
//!
//! ```text
//!                 ┌───────────────────┐
//!                 │  VectorStore      │
//!                 │  (async trait)    │
//!                 └─────────┬─────────┘
//!                           │
//!            ┌──────────────┼──────────────┐
//!            ▼              ▼              ▼
//!     ┌────────────┐ ┌────────────┐ ┌────────────┐
//!     │   SQLite   │ │  (future)  │ │  (future)  │
//!     │ sqlite-vec │ │  pgvector  │ │   Redis    │
//!     └────────────┘ └────────────┘ └────────────┘
//! ```

pub mod sqlite;

use async_trait::async_trait;

use crate::types::{ChunkRecord, MemoryError, Metadata, ScoredChunk};

pub use sqlite::SqliteMemoryStore;

/// Unified interface over vector storage engines.
///
/// Implementations must make [`VectorStore::replace_document`] atomic: a
/// concurrent reader never observes the deleted-but-not-yet-reinserted state
/// for a document, and a failure leaves the prior rows untouched.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Atomically delete all rows for `doc_id` and insert `records` in their
    /// place. An empty `records` slice clears the document. Returns the
    /// number of rows inserted.
    async fn replace_document(
        &self,
        doc_id: &str,
        records: Vec<ChunkRecord>,
    ) -> Result<usize, MemoryError>;

    /// Rank stored chunks by cosine similarity to `query`, restricted to
    /// rows matching every `filter` key/value exactly and, when given, the
    /// `doc_id`. Returns at most `top_k` results, best first. A row lacking
    /// a filter key is excluded, never an error.
    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: Option<&Metadata>,
        doc_id: Option<&str>,
    ) -> Result<Vec<ScoredChunk>, MemoryError>;

    /// All rows for `doc_id`, ordered by ordinal. For inspection and tests.
    async fn document_chunks(&self, doc_id: &str) -> Result<Vec<ChunkRecord>, MemoryError>;

    /// Total number of stored chunks.
    async fn count(&self) -> Result<usize, MemoryError>;

    /// The vector width the storage column was created with.
    async fn dimension(&self) -> Result<usize, MemoryError>;
}
