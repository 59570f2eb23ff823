use thiserror::Error;

use crate::core::errors::RagError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] RagError),

    #[error("Failed to load tokenizer: {0}")]
    Tokenizer(#[source] RagError),

    #[error("Failed to initialize model provider: {0}")]
    Provider(#[source] RagError),

    #[error("Failed to load embedding store {path}: {source}")]
    Store {
        path: String,
        #[source]
        source: RagError,
    },

    #[error("Failed to build retrieval pipeline: {0}")]
    Pipeline(#[source] RagError),
}
