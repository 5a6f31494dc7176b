//! Provider registry and factory.
//!
//! Maps provider names to concrete [`LlmProvider`] implementations.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::AgentError;
use crate::llm::provider::LlmProvider;
use crate::llm::providers::{OllamaProvider, OpenAiProvider};

/// Creates an [`LlmProvider`] based on the configured provider name.
///
/// # Supported Providers
///
/// - `"ollama"` (default): native `/api/generate`
/// - `"openai"`: OpenAI-compatible APIs via `async-openai`
///
/// # Errors
///
/// Returns [`AgentError::UnsupportedProvider`] for unknown provider names.
pub fn create_provider(config: &AppConfig) -> Result<Arc<dyn LlmProvider>, AgentError> {
    match config.llm_provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),
        "openai" => Ok(Arc::new(OpenAiProvider::new(config))),
        other => Err(AgentError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}
