//! Consistency-guard reports.
//!
//! The embedding dimension is a contract between three parties that never
//! talk to each other directly: the configuration, the active provider, and
//! the storage column. [`DimensionReport`] holds all three observed values
//! so an operator can see *which* side drifted instead of just learning that
//! something is off.

use serde::{Deserialize, Serialize};

/// Result of the dimension cross-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionReport {
    /// Vector length the provider actually produced for a probe input.
    pub embedding_dim: usize,
    /// Vector length the configuration expects.
    pub configured_dim: usize,
    /// Vector width the storage column was declared with.
    pub storage_dim: usize,
    /// True only when all three agree.
    pub consistent: bool,
}

/// Dimension report plus a static configuration echo. Never carries
/// credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub dimensions: DimensionReport,
    pub provider: String,
    pub model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub dedup_enabled: bool,
    pub dedup_threshold: f32,
}
