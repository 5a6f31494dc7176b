//! Pluggable LLM backend trait.

use async_trait::async_trait;

use super::message::{Completion, CompletionRequest};
use crate::error::AgentError;

/// An LLM backend.
///
/// Implementations own a pooled HTTP client and are shared across requests
/// behind an `Arc`. Deadlines are applied by callers, not here.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Backend name (`"ollama"`, `"openai"`).
    fn name(&self) -> &'static str;

    /// Runs one completion.
    ///
    /// # Errors
    ///
    /// [`AgentError::Unreachable`] when the backend cannot be contacted,
    /// [`AgentError::ApiRequest`] on error statuses, and
    /// [`AgentError::ResponseParse`] when the reply carries no text.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, AgentError>;

    /// Checks that the backend answers.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if it does not.
    async fn ping(&self) -> Result<(), AgentError>;
}
