//! LLM access layer.
//!
//! A pluggable backend abstraction over Ollama's native API or any
//! OpenAI-compatible endpoint, plus the [`Agent`] trait used by the
//! pipeline's extractor and summarizer.

pub mod client;
pub mod message;
pub mod provider;
pub mod providers;
pub mod traits;

pub use client::create_provider;
pub use message::{Completion, CompletionRequest, ReplyFormat, TokenUsage};
pub use provider::LlmProvider;
pub use traits::Agent;
