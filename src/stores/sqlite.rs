//! SQLite-backed vector store using the `sqlite-vec` extension.
//!
//! One `chunks` table holds the rows; embeddings live in a BLOB column in
//! `vec_f32` layout so `vec_distance_cosine` can rank them directly. A small
//! `store_meta` table records the vector width the store was created with,
//! which the consistency guard reads back as the storage dimension.
//!
//! All access goes through a single `tokio_rusqlite::Connection`, whose call
//! queue serializes writers; the delete-then-insert replace additionally runs
//! inside one transaction, so readers never observe a half-replaced document.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_rusqlite::{Connection, ffi};

use super::VectorStore;
use crate::types::{ChunkRecord, MemoryError, Metadata, ScoredChunk};

const DIMENSION_KEY: &str = "vector_dimension";

/// Chunk storage on SQLite with cosine ranking via `sqlite-vec`.
#[derive(Clone)]
pub struct SqliteMemoryStore {
    conn: Connection,
    dimension: usize,
}

impl SqliteMemoryStore {
    /// Open (or create) a store at `path`, declaring `dimension` as the
    /// vector width for a fresh database. An existing database keeps the
    /// width it was created with; the consistency guard surfaces any drift.
    pub async fn open(path: impl AsRef<Path>, dimension: usize) -> Result<Self, MemoryError> {
        register_sqlite_vec()?;
        let conn = Connection::open(path.as_ref().to_path_buf())
            .await
            .map_err(|err| MemoryError::Storage(err.to_string()))?;
        Self::initialize(conn, dimension).await
    }

    /// Open a private in-memory store. Used by tests and throwaway runs.
    pub async fn open_in_memory(dimension: usize) -> Result<Self, MemoryError> {
        register_sqlite_vec()?;
        let conn = Connection::open_in_memory()
            .await
            .map_err(|err| MemoryError::Storage(err.to_string()))?;
        Self::initialize(conn, dimension).await
    }

    async fn initialize(conn: Connection, dimension: usize) -> Result<Self, MemoryError> {
        let declared = conn
            .call(move |conn| {
                conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS chunks (
                        id TEXT PRIMARY KEY,
                        doc_id TEXT NOT NULL,
                        ordinal INTEGER NOT NULL,
                        content TEXT NOT NULL,
                        embedding BLOB NOT NULL,
                        metadata TEXT NOT NULL,
                        created_at TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_chunks_doc_id ON chunks (doc_id);
                    CREATE TABLE IF NOT EXISTS store_meta (
                        key TEXT PRIMARY KEY,
                        value TEXT NOT NULL
                    );",
                )
                .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let declared_width = dimension.to_string();
                conn.execute(
                    "INSERT OR IGNORE INTO store_meta (key, value) VALUES (?, ?)",
                    [DIMENSION_KEY, declared_width.as_str()],
                )
                .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let declared: String = conn
                    .query_row(
                        "SELECT value FROM store_meta WHERE key = ?",
                        [DIMENSION_KEY],
                        |row| row.get(0),
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(declared)
            })
            .await
            .map_err(|err| MemoryError::Storage(err.to_string()))?;

        let dimension = declared.parse::<usize>().map_err(|_| {
            MemoryError::Storage(format!("corrupt store metadata: {DIMENSION_KEY}='{declared}'"))
        })?;

        Ok(Self { conn, dimension })
    }
}

#[async_trait]
impl VectorStore for SqliteMemoryStore {
    async fn replace_document(
        &self,
        doc_id: &str,
        records: Vec<ChunkRecord>,
    ) -> Result<usize, MemoryError> {
        for record in &records {
            if record.embedding.len() != self.dimension {
                return Err(MemoryError::Storage(format!(
                    "embedding length {} does not match store dimension {}",
                    record.embedding.len(),
                    self.dimension
                )));
            }
        }

        // Serialize outside the connection thread so only SQLite errors can
        // surface from the closure.
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let embedding_json = serde_json::to_string(&record.embedding)
                .map_err(|err| MemoryError::Storage(err.to_string()))?;
            let metadata_json = serde_json::to_string(&record.metadata)
                .map_err(|err| MemoryError::Storage(err.to_string()))?;
            rows.push((
                record.id,
                record.doc_id,
                record.ordinal as i64,
                record.text,
                embedding_json,
                metadata_json,
                record.created_at.to_rfc3339(),
            ));
        }

        let doc_id = doc_id.to_string();
        let doc_id_log = doc_id.clone();
        let inserted = self
            .conn
            .call(move |conn| {
                let tx = conn
                    .transaction()
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                tx.execute("DELETE FROM chunks WHERE doc_id = ?", [&doc_id])
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                {
                    let mut stmt = tx
                        .prepare(
                            "INSERT INTO chunks
                                 (id, doc_id, ordinal, content, embedding, metadata, created_at)
                             VALUES (?, ?, ?, ?, vec_f32(?), ?, ?)",
                        )
                        .map_err(tokio_rusqlite::Error::Rusqlite)?;
                    for row in &rows {
                        let (id, doc, ordinal, content, embedding, metadata, created) = row;
                        stmt.raw_bind_parameter(1, id)
                            .map_err(tokio_rusqlite::Error::Rusqlite)?;
                        stmt.raw_bind_parameter(2, doc)
                            .map_err(tokio_rusqlite::Error::Rusqlite)?;
                        stmt.raw_bind_parameter(3, ordinal)
                            .map_err(tokio_rusqlite::Error::Rusqlite)?;
                        stmt.raw_bind_parameter(4, content)
                            .map_err(tokio_rusqlite::Error::Rusqlite)?;
                        stmt.raw_bind_parameter(5, embedding)
                            .map_err(tokio_rusqlite::Error::Rusqlite)?;
                        stmt.raw_bind_parameter(6, metadata)
                            .map_err(tokio_rusqlite::Error::Rusqlite)?;
                        stmt.raw_bind_parameter(7, created)
                            .map_err(tokio_rusqlite::Error::Rusqlite)?;
                        stmt.raw_execute().map_err(tokio_rusqlite::Error::Rusqlite)?;
                    }
                }
                tx.commit().map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(rows.len())
            })
            .await
            .map_err(|err| MemoryError::Storage(err.to_string()))?;

        tracing::debug!(doc_id = %doc_id_log, inserted, "replaced document rows");
        Ok(inserted)
    }

    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: Option<&Metadata>,
        doc_id: Option<&str>,
    ) -> Result<Vec<ScoredChunk>, MemoryError> {
        let query_json = serde_json::to_string(query)
            .map_err(|err| MemoryError::Storage(err.to_string()))?;

        // All predicate values are bound as strings; metadata comparisons go
        // through json_extract on both sides so text, numbers, and booleans
        // compare with their JSON types rather than lexically. Values alone
        // are not enough: SQLite extracts `true` as integer 1, so the json_type
        // check is what keeps booleans from conflating with numbers.
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<String> = vec![query_json];
        if let Some(doc_id) = doc_id {
            clauses.push("doc_id = ?".to_string());
            params.push(doc_id.to_string());
        }
        if let Some(filter) = filter {
            for (key, value) in filter {
                // '$."key"' paths have no escape for an embedded quote.
                if key.contains('"') {
                    return Err(MemoryError::Validation(format!(
                        "metadata filter key {key:?} must not contain '\"'"
                    )));
                }
                let path = format!("$.\"{key}\"");
                let value_json = serde_json::to_string(value)
                    .map_err(|err| MemoryError::Storage(err.to_string()))?;
                clauses.push(
                    "(json_extract(metadata, ?) = json_extract(?, '$') \
                      AND json_type(metadata, ?) = json_type(?, '$'))"
                        .to_string(),
                );
                params.push(path.clone());
                params.push(value_json.clone());
                params.push(path);
                params.push(value_json);
            }
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT doc_id, content, metadata, \
                 vec_distance_cosine(embedding, vec_f32(?)) AS distance \
             FROM chunks{where_clause} \
             ORDER BY distance ASC, doc_id ASC, ordinal ASC \
             LIMIT {top_k}"
        );

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql).map_err(tokio_rusqlite::Error::Rusqlite)?;
                for (i, param) in params.iter().enumerate() {
                    stmt.raw_bind_parameter(i + 1, param)
                        .map_err(tokio_rusqlite::Error::Rusqlite)?;
                }

                let mut results = Vec::new();
                let mut rows = stmt.raw_query();
                while let Some(row) = rows.next().map_err(tokio_rusqlite::Error::Rusqlite)? {
                    let doc_id: String = row.get(0).map_err(tokio_rusqlite::Error::Rusqlite)?;
                    let content: String = row.get(1).map_err(tokio_rusqlite::Error::Rusqlite)?;
                    let metadata: String = row.get(2).map_err(tokio_rusqlite::Error::Rusqlite)?;
                    let distance: f64 = row.get(3).map_err(tokio_rusqlite::Error::Rusqlite)?;
                    results.push(ScoredChunk {
                        text: content,
                        score: (1.0 - distance) as f32,
                        doc_id,
                        metadata: serde_json::from_str(&metadata).unwrap_or_default(),
                    });
                }
                Ok(results)
            })
            .await
            .map_err(|err| MemoryError::Storage(err.to_string()))
    }

    async fn document_chunks(&self, doc_id: &str) -> Result<Vec<ChunkRecord>, MemoryError> {
        let doc_id = doc_id.to_string();
        let raw_rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, doc_id, ordinal, content, embedding, metadata, created_at
                         FROM chunks WHERE doc_id = ? ORDER BY ordinal ASC",
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let rows = stmt
                    .query_map([&doc_id], |row| {
                        let id: String = row.get(0)?;
                        let doc_id: String = row.get(1)?;
                        let ordinal: i64 = row.get(2)?;
                        let text: String = row.get(3)?;
                        let blob: Vec<u8> = row.get(4)?;
                        let metadata: String = row.get(5)?;
                        let created_at: String = row.get(6)?;
                        Ok((id, doc_id, ordinal, text, blob, metadata, created_at))
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
                }
                Ok(results)
            })
            .await
            .map_err(|err| MemoryError::Storage(err.to_string()))?;

        let mut records = Vec::with_capacity(raw_rows.len());
        for (id, doc_id, ordinal, text, blob, metadata, created_at) in raw_rows {
            records.push(ChunkRecord {
                id,
                doc_id,
                ordinal: ordinal as usize,
                text,
                embedding: decode_embedding(&blob),
                metadata: serde_json::from_str(&metadata).unwrap_or_default(),
                created_at: parse_timestamp(&created_at)?,
            });
        }
        Ok(records)
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        self.conn
            .call(|conn| {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| MemoryError::Storage(err.to_string()))
    }

    async fn dimension(&self) -> Result<usize, MemoryError> {
        Ok(self.dimension)
    }
}

/// Register the `sqlite-vec` extension for every connection opened by this
/// process. Idempotent; the first outcome is cached.
fn register_sqlite_vec() -> Result<(), MemoryError> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();

    let result = INIT.get_or_init(|| unsafe {
        type SqliteExtensionInit = unsafe extern "C" fn(
            *mut ffi::sqlite3,
            *mut *const c_char,
            *const ffi::sqlite3_api_routines,
        ) -> i32;

        let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
        let init_fn: SqliteExtensionInit =
            transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
        let rc = ffi::sqlite3_auto_extension(Some(init_fn));
        if rc != 0 {
            Err(format!("failed to register sqlite-vec extension (code {rc})"))
        } else {
            Ok(())
        }
    });

    result.clone().map_err(MemoryError::Storage)
}

/// `vec_f32` stores embeddings as little-endian f32 bytes.
fn decode_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect()
}

/// Timestamps are written by [`SqliteMemoryStore::replace_document`] in
/// RFC 3339; anything else means the row was tampered with.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, MemoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| MemoryError::Storage(format!("corrupt created_at {raw:?}: {err}")))
}
