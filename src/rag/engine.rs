//! Retrieval pipeline: ingestion and question answering.

use std::path::Path;
use std::sync::Arc;

use super::context_builder::{AssembledContext, ContextBuilder};
use super::prompt::build_prompt;
use super::ranker::rank;
use super::records::{load_records, prepare_chunks};
use super::store::EmbeddingStore;
use crate::core::config::{CompletionConfig, PipelineConfig};
use crate::core::errors::RagError;
use crate::llm::{CompletionRequest, ModelProvider};
use crate::tokenizer::TokenCounter;

/// Posted to the user whenever an answer cannot be produced.
pub const FALLBACK_ANSWER: &str =
    "Sorry, I couldn't come up with an answer right now. Please try again later.";

/// Read-only query pipeline over one loaded store.
#[derive(Clone)]
pub struct RagPipeline {
    completion: CompletionConfig,
    builder: ContextBuilder,
    tokenizer: Arc<dyn TokenCounter>,
    provider: Arc<dyn ModelProvider>,
    store: Arc<EmbeddingStore>,
}

impl RagPipeline {
    pub fn new(
        config: PipelineConfig,
        completion: CompletionConfig,
        tokenizer: Arc<dyn TokenCounter>,
        provider: Arc<dyn ModelProvider>,
        store: Arc<EmbeddingStore>,
    ) -> Result<Self, RagError> {
        config.validate()?;
        if store.dimension() != config.vector_dimension {
            return Err(RagError::InvalidConfiguration(format!(
                "store dimension {} does not match vector_dimension {}",
                store.dimension(),
                config.vector_dimension
            )));
        }

        Ok(Self {
            completion,
            builder: ContextBuilder::new(config.budget()?),
            tokenizer,
            provider,
            store,
        })
    }

    pub fn store(&self) -> &EmbeddingStore {
        &self.store
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Embeds `query`, ranks the store against it and assembles the context.
    pub async fn retrieve_context(&self, query: &str) -> Result<AssembledContext, RagError> {
        let mut embeddings = self.provider.embed(&[query.to_string()]).await?;
        if embeddings.len() != 1 {
            return Err(RagError::EmbeddingProvider(format!(
                "expected 1 query embedding, got {}",
                embeddings.len()
            )));
        }
        let query_vector = embeddings.swap_remove(0);

        let ranked = rank(&query_vector, &self.store, self.tokenizer.as_ref())?;
        Ok(self.builder.assemble_detailed(&ranked))
    }

    pub async fn answer(&self, query: &str) -> Result<String, RagError> {
        let question = query.trim();
        if question.is_empty() {
            return Err(RagError::EmptyQuery);
        }

        let context = self.retrieve_context(question).await?;
        tracing::info!(
            "Answering with {} context chunks ({} tokens): {:?}",
            context.labels.len(),
            context.token_count,
            context.labels
        );

        let prompt = build_prompt(&self.completion.instruction, &context.text, question);
        let request = CompletionRequest::from_config(&self.completion, prompt);
        let answer = self.provider.complete(request).await?;
        Ok(answer.trim().to_string())
    }
}

/// Rebuilds the store from the source records and overwrites `store_path`.
pub async fn ingest(
    config: &PipelineConfig,
    tokenizer: &dyn TokenCounter,
    provider: &dyn ModelProvider,
    records_path: &Path,
    store_path: &Path,
) -> Result<EmbeddingStore, RagError> {
    config.validate()?;

    let records = load_records(records_path)?;
    let chunks = prepare_chunks(&records, config.chunk_token_limit, tokenizer)?;
    tracing::info!(
        "Embedding {} chunks with provider '{}'",
        chunks.len(),
        provider.name()
    );

    let store = EmbeddingStore::build(chunks, provider, config.vector_dimension).await?;
    store.save(store_path)?;
    Ok(store)
}
