use serde_json::{json, Value};

use crate::rag::prompt::DEFAULT_INSTRUCTION;

pub const DEFAULT_TOKEN_BUDGET: u64 = 2500;
pub const DEFAULT_CHUNK_TOKEN_LIMIT: u64 = 1000;
pub const DEFAULT_VECTOR_DIMENSION: u64 = 1536;

/// Built-in configuration; `config.yml` and `secrets.yaml` are merged over it.
pub fn default_config() -> Value {
    json!({
        "pipeline": {
            "token_budget": DEFAULT_TOKEN_BUDGET,
            "chunk_token_limit": DEFAULT_CHUNK_TOKEN_LIMIT,
            "vector_dimension": DEFAULT_VECTOR_DIMENSION,
        },
        "provider": {
            "base_url": "https://api.openai.com/v1",
            "embedding_model": "text-embedding-ada-002",
            "embedding_batch_size": 512,
            "timeout_secs": 60,
            "max_retries": 2,
        },
        "completion": {
            "model": "gpt-3.5-turbo-instruct",
            "instruction": DEFAULT_INSTRUCTION,
            "max_tokens": 150,
            "temperature": 0.5,
            "presence_penalty": 0.0,
            "frequency_penalty": 0.0,
            "best_of": 1,
        },
        "slack": {},
        "server": {
            "host": "0.0.0.0",
            "port": 3000,
        },
    })
}
