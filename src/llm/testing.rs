//! Scripted in-memory provider for pipeline tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::provider::ModelProvider;
use super::types::CompletionRequest;
use crate::core::errors::RagError;

pub struct StaticProvider {
    dimension: usize,
    vectors: HashMap<String, Vec<f32>>,
    completion: Result<String, String>,
    truncate_batches: bool,
    fail_embeddings: bool,
    embed_calls: AtomicUsize,
    prompts: Mutex<Vec<CompletionRequest>>,
}

impl StaticProvider {
    /// Unknown inputs embed to the all-ones vector.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: HashMap::new(),
            completion: Ok("I don't know".to_string()),
            truncate_batches: false,
            fail_embeddings: false,
            embed_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn with_completion(mut self, text: &str) -> Self {
        self.completion = Ok(text.to_string());
        self
    }

    pub fn failing_completion(mut self, message: &str) -> Self {
        self.completion = Err(message.to_string());
        self
    }

    pub fn failing_embeddings(mut self) -> Self {
        self.fail_embeddings = true;
        self
    }

    /// Drops the last vector of every batch.
    pub fn truncating_batches(mut self) -> Self {
        self.truncate_batches = true;
        self
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_embeddings {
            return Err(RagError::EmbeddingProvider("quota exceeded".to_string()));
        }
        let mut vectors: Vec<Vec<f32>> = inputs
            .iter()
            .map(|input| {
                self.vectors
                    .get(input)
                    .cloned()
                    .unwrap_or_else(|| vec![1.0; self.dimension])
            })
            .collect();
        if self.truncate_batches {
            vectors.pop();
        }
        Ok(vectors)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, RagError> {
        self.prompts.lock().unwrap().push(request);
        self.completion
            .clone()
            .map_err(RagError::CompletionProvider)
    }
}
