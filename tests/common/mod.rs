//! Fakes shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use logsift::config::AppConfig;
use logsift::core::ScoredHit;
use logsift::error::{AgentError, RetrievalError};
use logsift::llm::{Completion, CompletionRequest, LlmProvider};
use logsift::pipeline::{AnomalyPipeline, PromptSet};
use logsift::retrieval::{Embedder, Retriever, VectorStore};

/// How the fake model answers a matching request.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    /// Answers with the text after a pause.
    Delayed(Duration, String),
    Hang,
    Fail,
    /// A response wrapper with no readable text.
    Textless,
}

/// Answers by matching substrings of the user prompt, first match wins.
pub struct ScriptedProvider {
    rules: Vec<(String, Reply)>,
    fallback: Reply,
}

impl ScriptedProvider {
    pub fn new(fallback: Reply) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
        }
    }

    /// Matches the extractor prompt of the chunk holding record `index`.
    #[must_use]
    pub fn on_line(self, index: usize, reply: Reply) -> Self {
        self.on(&format!("\"text\":\"line-{index}\""), reply)
    }

    #[must_use]
    pub fn on(mut self, marker: &str, reply: Reply) -> Self {
        self.rules.push((marker.to_string(), reply));
        self
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, AgentError> {
        let prompt = &request.prompt;
        let reply = self
            .rules
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
            .map_or(&self.fallback, |(_, reply)| reply);

        match reply {
            Reply::Text(text) => Ok(completion(text)),
            Reply::Delayed(pause, text) => {
                tokio::time::sleep(*pause).await;
                Ok(completion(text))
            }
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(AgentError::Unreachable {
                    message: "never".to_string(),
                })
            }
            Reply::Fail => Err(AgentError::Unreachable {
                message: "connection refused".to_string(),
            }),
            Reply::Textless => Err(AgentError::ResponseParse {
                message: "no text in generate response".to_string(),
                content: "{}".to_string(),
            }),
        }
    }

    async fn ping(&self) -> Result<(), AgentError> {
        Ok(())
    }
}

fn completion(text: &str) -> Completion {
    Completion {
        text: text.to_string(),
        finish_reason: Some("stop".to_string()),
        ..Completion::default()
    }
}

pub struct FixedEmbedder;

#[async_trait]
impl Embedder for FixedEmbedder {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, RetrievalError> {
        Ok(vec![0.1, 0.2, 0.3])
    }
}

/// Returns `count` hits `line-0..line-{count-1}` in descending score order.
pub struct LinesStore {
    pub count: usize,
    pub up: bool,
}

#[async_trait]
impl VectorStore for LinesStore {
    fn name(&self) -> &'static str {
        "lines"
    }

    async fn similarity_search(
        &self,
        _embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredHit>, RetrievalError> {
        if !self.up {
            return Err(RetrievalError::Unreachable {
                message: "connection refused".to_string(),
            });
        }
        Ok((0..self.count.min(k))
            .map(|i| ScoredHit {
                score: 10.0 - f64::from(u32::try_from(i).unwrap_or(0)),
                timestamp: Some(format!("2024-05-01 10:00:0{i}")),
                level: Some("ERROR".to_string()),
                thread: Some(format!("worker-{i}")),
                message: Some(format!("message {i}")),
                text: Some(format!("line-{i}")),
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), RetrievalError> {
        if self.up {
            Ok(())
        } else {
            Err(RetrievalError::Unreachable {
                message: "down".to_string(),
            })
        }
    }
}

pub fn config(chunk_size: usize, llm_timeout: Duration) -> AppConfig {
    AppConfig::builder()
        .chunk_size(chunk_size)
        .llm_timeout(llm_timeout)
        .build()
        .unwrap_or_else(|_| unreachable!())
}

pub fn pipeline(provider: ScriptedProvider, store: LinesStore, config: AppConfig) -> AnomalyPipeline {
    let retriever = Retriever::new(Arc::new(FixedEmbedder), Arc::new(store));
    AnomalyPipeline::new(Arc::new(provider), Arc::new(retriever), config)
        .with_prompts(PromptSet::defaults())
}

pub const EMPTY: &str = r#"{"summary": "", "anomalies": []}"#;
