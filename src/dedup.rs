//! Greedy semantic deduplication within a single store request.
//!
//! The pass walks the chunk/vector pairs in their original order, keeping a
//! growing set of survivors. A pair whose cosine similarity against any
//! already-kept vector reaches the threshold is dropped as a near-duplicate.
//! Worst case is quadratic in the number of chunks, which is acceptable since
//! one request's chunk count is bounded by document size over chunk size.
//! No dedup state survives the request.

/// Cosine similarity in `[-1, 1]`. A zero-norm vector has no direction, so
/// similarity against it is reported as 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let x = f64::from(x);
        let y = f64::from(y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return 0.0;
    }
    (dot / denom) as f32
}

/// Filter `pairs` down to the chunks that are not near-duplicates of an
/// earlier survivor. Order of kept items is preserved.
///
/// The threshold is inclusive: a pair whose best similarity against the kept
/// set equals `threshold` is dropped. A threshold of 1.0 therefore only
/// drops effectively identical embeddings.
pub fn dedupe(pairs: Vec<(String, Vec<f32>)>, threshold: f32) -> Vec<(String, Vec<f32>)> {
    let mut kept: Vec<(String, Vec<f32>)> = Vec::with_capacity(pairs.len());
    for (text, vector) in pairs {
        let duplicate = kept
            .iter()
            .any(|(_, survivor)| cosine_similarity(survivor, &vector) >= threshold);
        if duplicate {
            tracing::debug!(
                chunk_len = text.len(),
                threshold,
                "dropping near-duplicate chunk"
            );
        } else {
            kept.push((text, vector));
        }
    }
    kept
}
