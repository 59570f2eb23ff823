pub mod openai;
pub mod provider;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use openai::OpenAiProvider;
pub use provider::ModelProvider;
pub use types::CompletionRequest;
