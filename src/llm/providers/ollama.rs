//! Native Ollama provider using `/api/generate`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::config::AppConfig;
use crate::error::AgentError;
use crate::llm::message::{Completion, CompletionRequest, TokenUsage};
use crate::llm::provider::LlmProvider;

/// Connect deadline; read deadlines are applied per call by the pipeline.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// JSON pointers tried, in order, to find the generated text.
const TEXT_PATHS: &[&str] = &[
    "/response",
    "/choices/0/text",
    "/choices/0/message/content",
    "/message/content",
    "/text",
    "/output",
];

/// Ollama generate-API provider.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaProvider {
    /// Creates a provider talking to `config.ollama_url`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiRequest`] if the HTTP client cannot be built.
    pub fn new(config: &AppConfig) -> Result<Self, AgentError> {
        Self::with_base_url(&config.ollama_url)
    }

    /// Creates a provider for an explicit base URL.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiRequest`] if the HTTP client cannot be built.
    pub fn with_base_url(base_url: &str) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| AgentError::ApiRequest {
                message: format!("failed to build HTTP client: {e}"),
                status: None,
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_body(request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "system": request.system,
            "prompt": request.prompt,
            "stream": false,
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens,
            },
        });
        if request.wants_json() {
            body["format"] = json!("json");
        }
        body
    }

    /// Pulls the generated text out of a generate response.
    fn extract_text(response: &Value) -> Option<String> {
        TEXT_PATHS.iter().find_map(|path| {
            response
                .pointer(path)
                .and_then(Value::as_str)
                .map(ToString::to_string)
        })
    }

    fn extract_usage(response: &Value) -> TokenUsage {
        let count = |key: &str| {
            response
                .get(key)
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0)
        };
        TokenUsage {
            prompt_tokens: count("prompt_eval_count"),
            completion_tokens: count("eval_count"),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, AgentError> {
        let url = format!("{}/api/generate", self.base_url);
        let response: Value = self
            .client
            .post(&url)
            .json(&Self::build_body(request))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text = Self::extract_text(&response).ok_or_else(|| AgentError::ResponseParse {
            message: "missing generated text in Ollama response".to_string(),
            content: response.to_string(),
        })?;

        Ok(Completion {
            text,
            usage: Self::extract_usage(&response),
            finish_reason: response
                .get("done_reason")
                .and_then(Value::as_str)
                .map(ToString::to_string),
        })
    }

    async fn ping(&self) -> Result<(), AgentError> {
        let url = format!("{}/api/tags", self.base_url);
        self.client.get(&url).send().await?.error_for_status()?;
        Ok(())
    }
}
