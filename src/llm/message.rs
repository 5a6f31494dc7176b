//! Provider-agnostic completion types.
//!
//! Every pipeline call is a single turn: one system prompt, one user prompt,
//! one reply. Backends translate this into their own wire format.

use serde::{Deserialize, Serialize};

/// Finish reason reported when the token budget cut the reply short.
const TRUNCATED: &str = "length";

/// Shape the reply is expected to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyFormat {
    /// Free text.
    #[default]
    Text,
    /// A single JSON object; backends that support it enforce this.
    Json,
}

/// One completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier (e.g. `"phi3"`).
    pub model: String,
    /// Role instructions.
    pub system: String,
    /// Task input.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Response token budget.
    pub max_tokens: u32,
    /// Expected reply shape.
    pub format: ReplyFormat,
}

impl CompletionRequest {
    /// Whether the caller asked for JSON output.
    #[must_use]
    pub fn wants_json(&self) -> bool {
        self.format == ReplyFormat::Json
    }
}

/// Token counts reported by the backend, zero when unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: u32,
    /// Tokens generated.
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Prompt plus completion tokens.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// A model reply.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    /// Generated text.
    pub text: String,
    /// Token counts.
    pub usage: TokenUsage,
    /// Backend-reported stop reason (`"stop"`, `"length"`, ...).
    pub finish_reason: Option<String>,
}

impl Completion {
    /// Whether the reply stopped at the token budget.
    #[must_use]
    pub fn was_truncated(&self) -> bool {
        self.finish_reason.as_deref() == Some(TRUNCATED)
    }
}
