//! Per-chunk anomaly extraction.
//!
//! One LLM call per chunk. The model's reply is untrusted: it is reduced to
//! the first JSON object it contains and each anomaly entry is validated on
//! its own, so one malformed entry never discards the rest of the chunk.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use super::chunker::Chunk;
use super::prompt::build_extractor_prompt;
use super::types::{Diagnostic, RawAnomaly};
use crate::config::AppConfig;
use crate::core::Severity;
use crate::error::AgentError;
use crate::llm::{Agent, Completion, LlmProvider, ReplyFormat, TokenUsage};

/// Maximum anomalies accepted from a single chunk.
const MAX_ANOMALIES_PER_CHUNK: usize = 200;

/// Maximum byte length of a reason, summary or next action.
const MAX_TEXT_LEN: usize = 2_000;

/// Response budget for one chunk.
const EXTRACTOR_MAX_TOKENS: u32 = 1024;

/// Delay before the first retry; doubles on each further attempt.
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Ceiling for a single retry delay.
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(10);

/// First `{ ... }` span in the reply, across newlines.
static JSON_OBJECT: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").ok());

/// Parsed output of one chunk call.
#[derive(Debug, Clone, Default)]
pub struct ChunkExtraction {
    /// Chunk the output belongs to.
    pub chunk_index: usize,
    /// The model's short summary for this chunk, if any.
    pub summary: Option<String>,
    /// Entries that passed validation, in the model's order.
    pub anomalies: Vec<RawAnomaly>,
    /// Entries or responses that were dropped.
    pub diagnostics: Vec<Diagnostic>,
    /// Token usage of the call.
    pub usage: TokenUsage,
}

/// Agent that asks the model for anomalies in one chunk.
pub struct ExtractorAgent {
    model: String,
    system_prompt: String,
    timeout: Duration,
    max_retries: u32,
}

impl ExtractorAgent {
    /// Creates an extractor with the configured model, deadline and retries.
    #[must_use]
    pub fn new(config: &AppConfig, system_prompt: String) -> Self {
        Self {
            model: config.model.clone(),
            system_prompt,
            timeout: config.llm_timeout,
            max_retries: config.max_retries,
        }
    }

    /// Runs one chunk through the model and parses the reply.
    ///
    /// Each attempt is bounded by the configured timeout. Only transport
    /// failures are retried; a timeout ends the chunk immediately.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Timeout`] when the deadline passes and the
    /// provider's error when the call fails for good. Malformed replies are
    /// not errors; they come back as diagnostics, including a response the
    /// provider could not read any text from.
    pub async fn extract(
        &self,
        provider: &dyn LlmProvider,
        chunk: &Chunk,
    ) -> Result<ChunkExtraction, AgentError> {
        let user_msg = build_extractor_prompt(chunk);
        let reply = match self.call_with_retry(provider, chunk, &user_msg).await {
            Ok(reply) => reply,
            Err(AgentError::ResponseParse { message, .. }) => {
                debug!(chunk = chunk.chunk_index(), %message, "unreadable chunk response");
                return Ok(ChunkExtraction {
                    chunk_index: chunk.chunk_index(),
                    diagnostics: vec![Diagnostic::ParseError {
                        chunk_index: chunk.chunk_index(),
                        message,
                    }],
                    ..ChunkExtraction::default()
                });
            }
            Err(e) => return Err(e),
        };

        let mut extraction = parse_response(&reply.text, chunk);
        extraction.usage = reply.usage;

        if reply.was_truncated() {
            for diag in &mut extraction.diagnostics {
                if let Diagnostic::ParseError { message, .. } = diag {
                    message.push_str(" (response truncated at the token limit)");
                }
            }
        }

        Ok(extraction)
    }

    async fn call_with_retry(
        &self,
        provider: &dyn LlmProvider,
        chunk: &Chunk,
        user_msg: &str,
    ) -> Result<Completion, AgentError> {
        let mut attempt: u32 = 0;
        loop {
            match tokio::time::timeout(self.timeout, self.run(provider, user_msg)).await {
                Err(_) => return Err(AgentError::timeout(self.timeout)),
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        chunk = chunk.chunk_index(),
                        attempt,
                        error = %e,
                        "chunk call failed, retrying"
                    );
                    tokio::time::sleep(retry_delay(attempt)).await;
                }
                Ok(Err(e)) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl Agent for ExtractorAgent {
    fn name(&self) -> &'static str {
        "extractor"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn reply_format(&self) -> ReplyFormat {
        ReplyFormat::Json
    }

    fn temperature(&self) -> f32 {
        0.0
    }

    fn max_tokens(&self) -> u32 {
        EXTRACTOR_MAX_TOKENS
    }
}

/// Delay before retry number `attempt` (1-based), capped.
fn retry_delay(attempt: u32) -> Duration {
    RETRY_BACKOFF
        .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
        .min(MAX_RETRY_BACKOFF)
}

/// Reduces a model reply to validated anomalies for `chunk`.
///
/// Never fails: an unusable reply yields no anomalies and one
/// [`Diagnostic::ParseError`].
#[must_use]
pub fn parse_response(content: &str, chunk: &Chunk) -> ChunkExtraction {
    let chunk_index = chunk.chunk_index();
    let mut extraction = ChunkExtraction {
        chunk_index,
        ..ChunkExtraction::default()
    };

    let document = match locate_json(content) {
        Ok(value) => value,
        Err(message) => {
            debug!(chunk = chunk_index, %message, "unparseable chunk response");
            extraction
                .diagnostics
                .push(Diagnostic::ParseError {
                    chunk_index,
                    message,
                });
            return extraction;
        }
    };

    // A bare array is read as the anomaly list itself.
    let (entries, actions) = match &document {
        Value::Array(items) => (items.as_slice(), &[][..]),
        Value::Object(map) => {
            extraction.summary = map
                .get("summary")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| clip(s.to_string()));
            (
                map.get("anomalies")
                    .and_then(Value::as_array)
                    .map_or(&[][..], Vec::as_slice),
                map.get("next_actions")
                    .and_then(Value::as_array)
                    .map_or(&[][..], Vec::as_slice),
            )
        }
        _ => (&[][..], &[][..]),
    };

    for (position, entry) in entries.iter().take(MAX_ANOMALIES_PER_CHUNK).enumerate() {
        match parse_entry(entry, actions.get(position), chunk.base_offset()) {
            Ok(anomaly) => extraction.anomalies.push(anomaly),
            Err(message) => {
                debug!(chunk = chunk_index, position, %message, "dropped anomaly entry");
                extraction.diagnostics.push(Diagnostic::InvalidEntry {
                    chunk_index,
                    position,
                    message,
                });
            }
        }
    }

    if entries.len() > MAX_ANOMALIES_PER_CHUNK {
        extraction.diagnostics.push(Diagnostic::InvalidEntry {
            chunk_index,
            position: MAX_ANOMALIES_PER_CHUNK,
            message: format!(
                "{} entries beyond the per-chunk limit ignored",
                entries.len() - MAX_ANOMALIES_PER_CHUNK
            ),
        });
    }

    extraction
}

/// Finds the JSON document in a reply: the whole reply (minus code fences)
/// if it parses, otherwise the first `{ ... }` span.
fn locate_json(content: &str) -> Result<Value, String> {
    let trimmed = content.trim();
    let unfenced = if trimmed.starts_with("```") {
        trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
    } else {
        trimmed
    };

    if let Ok(value) = serde_json::from_str::<Value>(unfenced) {
        return Ok(value);
    }

    let span = JSON_OBJECT
        .as_ref()
        .and_then(|re| re.find(unfenced))
        .map(|m| m.as_str())
        .ok_or_else(|| format!("no JSON object in {} byte response", content.len()))?;

    serde_json::from_str::<Value>(span).map_err(|e| format!("invalid JSON: {e}"))
}

fn parse_entry(
    entry: &Value,
    positional_action: Option<&Value>,
    base_offset: usize,
) -> Result<RawAnomaly, String> {
    let obj = entry
        .as_object()
        .ok_or_else(|| "entry is not an object".to_string())?;

    let local_index = match obj.get("i") {
        Some(v) => v
            .as_i64()
            .ok_or_else(|| format!("index is not an integer: {v}"))?,
        None => return Err("missing index".to_string()),
    };

    let severity = obj
        .get("severity")
        .and_then(Value::as_str)
        .and_then(Severity::parse)
        .ok_or_else(|| match obj.get("severity") {
            Some(v) => format!("unknown severity: {v}"),
            None => "missing severity".to_string(),
        })?;

    let reason = obj
        .get("reason")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing or non-string reason".to_string())?;

    let own_action = obj.get("next_action").and_then(Value::as_str);
    let next_action = own_action
        .or_else(|| positional_action.and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| clip(s.to_string()));

    Ok(RawAnomaly {
        local_index,
        base_offset,
        reason: clip(reason.trim().to_string()),
        severity,
        next_action,
    })
}

/// Truncates to [`MAX_TEXT_LEN`] bytes on a char boundary.
fn clip(mut text: String) -> String {
    if text.len() > MAX_TEXT_LEN {
        let mut end = MAX_TEXT_LEN;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}
