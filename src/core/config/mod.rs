pub mod defaults;
pub mod paths;
pub mod service;
pub mod types;
pub mod validation;

pub use paths::AppPaths;
pub use service::{parse_app_config, ConfigService};
pub use types::{
    AppConfig, CompletionConfig, PipelineConfig, ProviderConfig, ServerConfig, SlackConfig,
};
