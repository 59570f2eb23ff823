use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::errors::RagError;
use crate::rag::context_builder::TokenBudget;

/// Typed view of the merged configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub provider: ProviderConfig,
    pub completion: CompletionConfig,
    #[serde(default)]
    pub slack: SlackConfig,
    pub server: ServerConfig,
    /// `tokenizer.json` used for token accounting; word counting is used when unset.
    #[serde(default)]
    pub tokenizer_path: Option<PathBuf>,
}

/// Options recognised by the retrieval pipeline itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of tokens the assembled context may contain.
    pub token_budget: usize,
    /// Records longer than this are split into sentence chunks before embedding.
    pub chunk_token_limit: usize,
    /// Length of every embedding vector in the store.
    pub vector_dimension: usize,
}

impl PipelineConfig {
    /// Rejects non-positive limits. Called once at startup.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunk_token_limit == 0 {
            return Err(RagError::InvalidConfiguration(
                "chunk_token_limit must be positive".to_string(),
            ));
        }
        if self.vector_dimension == 0 {
            return Err(RagError::InvalidConfiguration(
                "vector_dimension must be positive".to_string(),
            ));
        }
        self.budget().map(|_| ())
    }

    pub fn budget(&self) -> Result<TokenBudget, RagError> {
        TokenBudget::new(self.token_budget)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub embedding_model: String,
    pub embedding_batch_size: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    pub model: String,
    pub instruction: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    pub best_of: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackConfig {
    #[serde(default)]
    pub bot_token: Option<String>,
    #[serde(default)]
    pub signing_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_budget_fails_validation() {
        let config = PipelineConfig {
            token_budget: 0,
            chunk_token_limit: 10,
            vector_dimension: 2,
        };
        assert!(matches!(
            config.validate(),
            Err(RagError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn positive_limits_pass_validation() {
        let config = PipelineConfig {
            token_budget: 5,
            chunk_token_limit: 10,
            vector_dimension: 2,
        };
        config.validate().expect("valid config");
        assert_eq!(config.budget().expect("budget").get(), 5);
    }
}
