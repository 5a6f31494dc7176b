//! # logsift
//!
//! Semantic log retrieval with LLM anomaly extraction.
//!
//! A query is embedded and matched against an Elasticsearch index of log
//! lines. The top candidates are split into chunks, each chunk is sent to a
//! language model, and every anomaly the model reports is checked against
//! the lines it was actually shown. Claims that point nowhere are dropped
//! with a diagnostic instead of reaching the report.
//!
//! ## Modules
//!
//! - [`core`]: query, record and severity types
//! - [`retrieval`]: embedders, the vector store and the [`Retriever`](retrieval::Retriever)
//! - [`llm`]: provider abstraction over Ollama and OpenAI-compatible APIs
//! - [`pipeline`]: chunking, extraction, confirmation and aggregation
//! - [`health`]: dependency reachability probes
//! - [`server`]: the axum HTTP API
//! - [`cli`]: the command-line interface

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod health;
pub mod llm;
pub mod pipeline;
pub mod retrieval;
pub mod server;

pub use config::AppConfig;
pub use error::{Error, PipelineError, Result};
pub use pipeline::{AnalysisResult, AnomalyPipeline};
