use std::sync::Arc;

use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::core::errors::RagError;
use crate::llm::{ModelProvider, OpenAiProvider};
use crate::rag::{EmbeddingStore, RagPipeline};
use crate::server::slack::SlackClient;
use crate::tokenizer::{HfTokenizer, TokenCounter, WordTokenizer};

pub mod error;

use error::InitializationError;

/// Credentials for answering Slack events.
#[derive(Clone)]
pub struct SlackIntegration {
    pub client: SlackClient,
    pub signing_secret: String,
}

/// Shared state of the HTTP front end.
///
/// The pipeline and its store are read-only once built, so requests share
/// them without locking.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub pipeline: RagPipeline,
    pub slack: Option<SlackIntegration>,
}

impl AppState {
    /// Loads configuration and the persisted store, then wires the pipeline.
    ///
    /// A missing or malformed store is fatal: the server never answers from
    /// a partially parsed store.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone())
            .load_app_config()
            .map_err(InitializationError::Config)?;

        let tokenizer = load_tokenizer(&config, &paths).map_err(InitializationError::Tokenizer)?;
        let provider = build_provider(&config).map_err(InitializationError::Provider)?;

        let store = EmbeddingStore::load(&paths.store_path, config.pipeline.vector_dimension)
            .map_err(|source| InitializationError::Store {
                path: paths.store_path.display().to_string(),
                source,
            })?;

        let pipeline = RagPipeline::new(
            config.pipeline,
            config.completion.clone(),
            tokenizer,
            provider,
            Arc::new(store),
        )
        .map_err(InitializationError::Pipeline)?;

        let slack = slack_integration(&config);

        Ok(Arc::new(AppState {
            config,
            pipeline,
            slack,
        }))
    }
}

/// Uses the configured `tokenizer.json`, or word counting when none is set.
pub fn load_tokenizer(
    config: &AppConfig,
    paths: &AppPaths,
) -> Result<Arc<dyn TokenCounter>, RagError> {
    match &config.tokenizer_path {
        Some(path) => {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                paths.project_root.join(path)
            };
            tracing::info!("Using tokenizer {}", path.display());
            Ok(Arc::new(HfTokenizer::from_file(&path)?))
        }
        None => {
            tracing::warn!("No tokenizer_path configured; counting tokens by words");
            Ok(Arc::new(WordTokenizer))
        }
    }
}

pub fn build_provider(config: &AppConfig) -> Result<Arc<dyn ModelProvider>, RagError> {
    if config.provider.api_key.as_deref().unwrap_or_default().is_empty() {
        tracing::warn!("provider.api_key is not set; requests to {} are unauthenticated", config.provider.base_url);
    }
    Ok(Arc::new(OpenAiProvider::new(&config.provider)?))
}

fn slack_integration(config: &AppConfig) -> Option<SlackIntegration> {
    let token = config.slack.bot_token.clone().filter(|v| !v.is_empty());
    let secret = config.slack.signing_secret.clone().filter(|v| !v.is_empty());
    match (token, secret) {
        (Some(token), Some(signing_secret)) => Some(SlackIntegration {
            client: SlackClient::new(token),
            signing_secret,
        }),
        (None, None) => {
            tracing::warn!("Slack is not configured; /slack/events is disabled");
            None
        }
        _ => {
            tracing::warn!(
                "Slack needs both bot_token and signing_secret; /slack/events is disabled"
            );
            None
        }
    }
}
