//! Fixed-role callers of an [`LlmProvider`].

use async_trait::async_trait;

use super::message::{Completion, CompletionRequest, ReplyFormat};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// A pipeline role with a fixed system prompt and sampling settings.
///
/// The extractor and the summarizer implement this; callers wrap
/// [`run`](Self::run) in their own deadline and retry policy.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Role name for logs.
    fn name(&self) -> &'static str;

    /// Model identifier.
    fn model(&self) -> &str;

    /// Role instructions.
    fn system_prompt(&self) -> &str;

    /// Expected reply shape.
    fn reply_format(&self) -> ReplyFormat {
        ReplyFormat::Text
    }

    /// Sampling temperature.
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Response token budget.
    fn max_tokens(&self) -> u32;

    /// Builds the request for `prompt`.
    fn request(&self, prompt: &str) -> CompletionRequest {
        CompletionRequest {
            model: self.model().to_string(),
            system: self.system_prompt().to_string(),
            prompt: prompt.to_string(),
            temperature: self.temperature(),
            max_tokens: self.max_tokens(),
            format: self.reply_format(),
        }
    }

    /// Sends `prompt` to `provider` once.
    ///
    /// # Errors
    ///
    /// Propagates the provider's [`AgentError`].
    async fn run(&self, provider: &dyn LlmProvider, prompt: &str) -> Result<Completion, AgentError> {
        provider.complete(&self.request(prompt)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe;

    #[async_trait]
    impl Agent for Probe {
        fn name(&self) -> &'static str {
            "probe"
        }

        fn model(&self) -> &str {
            "phi3"
        }

        fn system_prompt(&self) -> &str {
            "be terse"
        }

        fn max_tokens(&self) -> u32 {
            64
        }
    }

    #[test]
    fn test_request_carries_role_settings() {
        let request = Probe.request("lines");
        assert_eq!(request.model, "phi3");
        assert_eq!(request.system, "be terse");
        assert_eq!(request.prompt, "lines");
        assert_eq!(request.max_tokens, 64);
        assert!(!request.wants_json());
    }
}
