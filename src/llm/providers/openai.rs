//! OpenAI-compatible backend via `async-openai`.
//!
//! Works against hosted APIs, proxies and Ollama's own `/v1` endpoint, which
//! is the default base URL when none is configured.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    CreateChatCompletionResponse, ResponseFormat,
};
use async_trait::async_trait;

use crate::config::AppConfig;
use crate::error::AgentError;
use crate::llm::message::{Completion, CompletionRequest, TokenUsage};
use crate::llm::provider::LlmProvider;

/// Key sent to local servers that ignore authentication.
const LOCAL_API_KEY: &str = "ollama";

/// Chat-completions backend.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    base_url: String,
}

impl OpenAiProvider {
    /// Creates a provider from the configured base URL and key.
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        let base_url = config
            .openai_base_url
            .clone()
            .unwrap_or_else(|| format!("{}/v1", config.ollama_url.trim_end_matches('/')));
        let api_key = config.api_key.as_deref().unwrap_or(LOCAL_API_KEY);

        let client = Client::with_config(
            OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(base_url.clone()),
        );
        Self { client, base_url }
    }

    /// System and user turns for `request`.
    fn messages(request: &CompletionRequest) -> Vec<ChatCompletionRequestMessage> {
        vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: ChatCompletionRequestSystemMessageContent::Text(request.system.clone()),
                name: None,
            }),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(request.prompt.clone()),
                name: None,
            }),
        ]
    }

    fn build_request(request: &CompletionRequest) -> CreateChatCompletionRequest {
        CreateChatCompletionRequest {
            model: request.model.clone(),
            messages: Self::messages(request),
            // Some compatible servers reject an explicit zero.
            temperature: Some(request.temperature).filter(|&t| t > 0.0),
            max_completion_tokens: Some(request.max_tokens),
            response_format: request.wants_json().then_some(ResponseFormat::JsonObject),
            ..Default::default()
        }
    }

    fn into_completion(response: CreateChatCompletionResponse) -> Completion {
        let usage = response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        let Some(choice) = response.choices.into_iter().next() else {
            return Completion {
                usage,
                ..Completion::default()
            };
        };

        Completion {
            text: choice.message.content.unwrap_or_default(),
            usage,
            finish_reason: choice
                .finish_reason
                .map(|r| format!("{r:?}").to_lowercase()),
        }
    }

    fn map_error(err: OpenAIError) -> AgentError {
        match err {
            OpenAIError::Reqwest(e) if e.is_connect() => AgentError::Unreachable {
                message: e.to_string(),
            },
            OpenAIError::Reqwest(e) => AgentError::ApiRequest {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            },
            OpenAIError::JSONDeserialize(e) => AgentError::ResponseParse {
                message: format!("invalid completion body: {e}"),
                content: String::new(),
            },
            other => AgentError::ApiRequest {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, AgentError> {
        let response = self
            .client
            .chat()
            .create(Self::build_request(request))
            .await
            .map_err(Self::map_error)?;
        Ok(Self::into_completion(response))
    }

    async fn ping(&self) -> Result<(), AgentError> {
        self.client
            .models()
            .list()
            .await
            .map(|_| ())
            .map_err(Self::map_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::message::ReplyFormat;

    fn request(format: ReplyFormat, temperature: f32) -> CompletionRequest {
        CompletionRequest {
            model: "phi3".to_string(),
            system: "sys".to_string(),
            prompt: "lines".to_string(),
            temperature,
            max_tokens: 100,
            format,
        }
    }

    #[test]
    fn test_messages_are_system_then_user() {
        let messages = OpenAiProvider::messages(&request(ReplyFormat::Text, 0.0));
        assert!(matches!(
            messages.as_slice(),
            [
                ChatCompletionRequestMessage::System(_),
                ChatCompletionRequestMessage::User(_)
            ]
        ));
    }

    #[test]
    fn test_build_request_json_mode() {
        let built = OpenAiProvider::build_request(&request(ReplyFormat::Json, 0.0));
        assert!(built.response_format.is_some());
        assert!(built.temperature.is_none());
        assert_eq!(built.max_completion_tokens, Some(100));
    }

    #[test]
    fn test_build_request_plain_text() {
        let built = OpenAiProvider::build_request(&request(ReplyFormat::Text, 0.2));
        assert!(built.response_format.is_none());
        assert_eq!(built.temperature, Some(0.2));
    }

    #[test]
    fn test_default_base_url_is_ollama_v1() {
        let config = AppConfig::builder()
            .ollama_url("http://localhost:11434/")
            .llm_provider("openai")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let provider = OpenAiProvider::new(&config);
        assert_eq!(provider.base_url, "http://localhost:11434/v1");
    }
}
