use async_trait::async_trait;

use super::types::CompletionRequest;
use crate::core::errors::RagError;

/// Embedding and completion model behind the pipeline.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name, such as `openai`.
    fn name(&self) -> &str;

    /// Embeds every input. The result has the same length and order as `inputs`.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Runs a non-streaming text completion.
    async fn complete(&self, request: CompletionRequest) -> Result<String, RagError>;
}
