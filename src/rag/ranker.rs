//! Exhaustive similarity ranking over the embedding store.

use serde::Serialize;

use super::store::{EmbeddingRecord, EmbeddingStore};
use crate::core::errors::RagError;
use crate::tokenizer::TokenCounter;
use crate::vector_math::cosine_distance;

/// A stored record scored against one query.
#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate<'a> {
    pub record: &'a EmbeddingRecord,
    /// Cosine distance to the query, in `[0, 2]`.
    pub distance: f64,
    pub token_count: usize,
}

/// Ranks every record by ascending cosine distance to `query`.
///
/// Records at equal distance keep their store order.
pub fn rank<'a>(
    query: &[f32],
    store: &'a EmbeddingStore,
    tokenizer: &dyn TokenCounter,
) -> Result<Vec<RankedCandidate<'a>>, RagError> {
    if query.len() != store.dimension() {
        return Err(RagError::EmbeddingProvider(format!(
            "query embedding has {} components, store uses {}",
            query.len(),
            store.dimension()
        )));
    }

    let mut ranked = store
        .records()
        .iter()
        .map(|record| {
            Ok(RankedCandidate {
                record,
                distance: cosine_distance(query, &record.vector)?,
                token_count: tokenizer.count(&record.text)?,
            })
        })
        .collect::<Result<Vec<_>, RagError>>()?;

    ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    Ok(ranked)
}
