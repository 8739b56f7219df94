//! Deterministic in-process embedding provider for tests and offline runs.

use std::collections::HashMap;

use async_trait::async_trait;

use super::EmbeddingProvider;
use crate::types::MemoryError;

/// Produces stable pseudo-random unit vectors derived from the text content.
///
/// Identical inputs always embed to identical vectors, different inputs to
/// (almost certainly) different ones, which is enough for exercising the
/// dedup and retrieval paths without a real model. Individual texts can be
/// pinned to exact vectors with [`MockEmbeddingProvider::with_vector`].
#[derive(Debug, Clone, Default)]
pub struct MockEmbeddingProvider {
    dimension: usize,
    canned: HashMap<String, Vec<f32>>,
}

impl MockEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            canned: HashMap::new(),
        }
    }

    /// Pin `text` to an exact vector, overriding the hashed one. Handy for
    /// tests that need precise cosine similarities.
    #[must_use]
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.canned.insert(text.into(), vector);
        self
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        if let Some(vector) = self.canned.get(text) {
            return vector.clone();
        }

        // FNV-1a over the bytes seeds a small xorshift generator.
        let mut seed: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in text.as_bytes() {
            seed ^= u64::from(*byte);
            seed = seed.wrapping_mul(0x0000_0100_0000_01b3);
        }
        if seed == 0 {
            seed = 0x9e37_79b9_7f4a_7c15;
        }

        let mut state = seed;
        let mut vector = Vec::with_capacity(self.dimension);
        for _ in 0..self.dimension {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            // Map to [-1, 1).
            let value = (state >> 11) as f64 / (1u64 << 53) as f64;
            vector.push((value * 2.0 - 1.0) as f32);
        }

        // Normalize so cosine scores stay well-conditioned.
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MemoryError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }

    fn declared_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
