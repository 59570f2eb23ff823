use ndarray::{Array1, ArrayView1};

use crate::core::errors::RagError;

/// Cosine similarity in `[-1, 1]`.
///
/// Zero-magnitude or non-finite input is rejected instead of producing `NaN`.
pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f64, RagError> {
    if query.len() != candidate.len() {
        return Err(RagError::EmbeddingProvider(format!(
            "vector length mismatch: {} != {}",
            query.len(),
            candidate.len()
        )));
    }

    let query = widen(query);
    let candidate = widen(candidate);
    let query_norm = l2_norm(&query, "query")?;
    let candidate_norm = l2_norm(&candidate, "candidate")?;

    let similarity = query.dot(&candidate) / (query_norm * candidate_norm);
    if !similarity.is_finite() {
        return Err(RagError::DegenerateVector(
            "cosine similarity is not finite".to_string(),
        ));
    }
    Ok(similarity.clamp(-1.0, 1.0))
}

/// `1 - cosine_similarity`: 0 for identical direction, 2 for opposite.
pub fn cosine_distance(query: &[f32], candidate: &[f32]) -> Result<f64, RagError> {
    Ok(1.0 - cosine_similarity(query, candidate)?)
}

fn widen(values: &[f32]) -> Array1<f64> {
    ArrayView1::from(values).mapv(f64::from)
}

fn l2_norm(vector: &Array1<f64>, role: &str) -> Result<f64, RagError> {
    let norm = vector.dot(vector).sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(RagError::DegenerateVector(format!(
            "{} vector has magnitude {}",
            role, norm
        )));
    }
    Ok(norm)
}
