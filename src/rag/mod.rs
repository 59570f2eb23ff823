//! Retrieval pipeline.
//!
//! Source records are chunked, embedded and persisted by [`engine::ingest`];
//! queries are ranked against the loaded store and answered by
//! [`RagPipeline`].

pub mod chunker;
pub mod context_builder;
pub mod csv;
pub mod engine;
pub mod prompt;
pub mod ranker;
pub mod records;
pub mod store;

pub use chunker::Chunk;
pub use context_builder::{AssembledContext, ContextBuilder, TokenBudget};
pub use engine::{ingest, RagPipeline, FALLBACK_ANSWER};
pub use ranker::{rank, RankedCandidate};
pub use store::{EmbeddingRecord, EmbeddingStore};
