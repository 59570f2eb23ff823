use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::provider::ModelProvider;
use super::types::CompletionRequest;
use crate::core::config::ProviderConfig;
use crate::core::errors::RagError;

/// OpenAI-compatible `/embeddings` and `/completions` client.
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: Option<String>,
    embedding_model: String,
    batch_size: usize,
    max_retries: u32,
    retry_base: Duration,
    client: Client,
}

#[derive(Serialize)]
struct EmbeddingBody<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| {
                RagError::InvalidConfiguration(format!("failed to build HTTP client: {}", err))
            })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
            embedding_model: config.embedding_model.clone(),
            batch_size: config.embedding_batch_size.max(1),
            max_retries: config.max_retries,
            retry_base: Duration::from_millis(500),
            client,
        })
    }

    /// Overrides the base delay between retries (doubled per attempt).
    pub fn with_retry_backoff(mut self, base: Duration) -> Self {
        self.retry_base = base;
        self
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let url = format!("{}/embeddings", self.base_url);
        let body = serde_json::to_value(EmbeddingBody {
            model: &self.embedding_model,
            input: inputs,
        })
        .map_err(|err| RagError::EmbeddingProvider(err.to_string()))?;

        let res = self
            .post_with_retry(&url, &body)
            .await
            .map_err(RagError::EmbeddingProvider)?;
        let response: EmbeddingResponse = res
            .json()
            .await
            .map_err(|err| RagError::EmbeddingProvider(format!("invalid response: {}", err)))?;

        if response.data.len() != inputs.len() {
            return Err(RagError::EmbeddingProvider(format!(
                "provider returned {} embeddings for {} inputs",
                response.data.len(),
                inputs.len()
            )));
        }

        response
            .data
            .into_iter()
            .enumerate()
            .map(|(position, entry)| {
                if entry.index != position {
                    return Err(RagError::EmbeddingProvider(format!(
                        "embedding at position {} carries index {}",
                        position, entry.index
                    )));
                }
                Ok(entry.embedding)
            })
            .collect()
    }

    async fn post_with_retry(&self, url: &str, body: &Value) -> Result<reqwest::Response, String> {
        let mut attempt = 0u32;
        loop {
            let mut request = self.client.post(url).json(body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            match request.send().await {
                Ok(res) if res.status().is_success() => return Ok(res),
                Ok(res) => {
                    let status = res.status();
                    let text = res.text().await.unwrap_or_default();
                    if should_retry(status) && attempt < self.max_retries {
                        attempt += 1;
                        tracing::warn!(
                            "{} returned {}; retrying ({}/{})",
                            url,
                            status,
                            attempt,
                            self.max_retries
                        );
                        tokio::time::sleep(self.retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(format!("request failed ({}): {}", status, text));
                }
                Err(err) => {
                    if (err.is_timeout() || err.is_connect()) && attempt < self.max_retries {
                        attempt += 1;
                        tracing::warn!("{} unreachable: {}; retrying", url, err);
                        tokio::time::sleep(self.retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(err.to_string());
                }
            }
        }
    }

    fn retry_backoff(&self, attempt: u32) -> Duration {
        self.retry_base * (1u32 << attempt.min(5))
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let mut embeddings = Vec::with_capacity(inputs.len());
        for batch in inputs.chunks(self.batch_size) {
            embeddings.extend(self.embed_batch(batch).await?);
        }
        tracing::debug!("Embedded {} inputs", embeddings.len());
        Ok(embeddings)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, RagError> {
        let url = format!("{}/completions", self.base_url);
        let body = serde_json::to_value(&request)
            .map_err(|err| RagError::CompletionProvider(err.to_string()))?;

        let res = self
            .post_with_retry(&url, &body)
            .await
            .map_err(RagError::CompletionProvider)?;
        let payload: Value = res
            .json()
            .await
            .map_err(|err| RagError::CompletionProvider(format!("invalid response: {}", err)))?;

        payload["choices"][0]["text"]
            .as_str()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| RagError::CompletionProvider("response has no completion text".to_string()))
    }
}
