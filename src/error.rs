//! Error types for logsift.
//!
//! Errors are layered: upstream clients raise [`AgentError`] (LLM) and
//! [`RetrievalError`] (embedder and vector store), the pipeline folds them
//! into the request-level [`PipelineError`] taxonomy, and the HTTP and CLI
//! surfaces map that taxonomy onto status codes and exit messages.

use std::time::Duration;

use thiserror::Error;

/// Result alias for top-level operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Pipeline failure.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Errors raised by LLM providers and agents.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// The provider answered with an error.
    #[error("LLM request failed: {message}")]
    ApiRequest {
        /// Error detail.
        message: String,
        /// HTTP status, when the provider returned one.
        status: Option<u16>,
    },

    /// The provider could not be reached at all.
    #[error("LLM service unreachable: {message}")]
    Unreachable {
        /// Error detail.
        message: String,
    },

    /// The call exceeded its deadline.
    #[error("LLM call timed out after {seconds}s")]
    Timeout {
        /// Configured deadline in seconds.
        seconds: u64,
    },

    /// The response body could not be interpreted.
    #[error("{message}")]
    ResponseParse {
        /// Error detail.
        message: String,
        /// Raw response content.
        content: String,
    },

    /// Unknown provider name.
    #[error("unsupported LLM provider: {name}")]
    UnsupportedProvider {
        /// The requested provider name.
        name: String,
    },
}

impl AgentError {
    /// Builds a timeout error for the given deadline.
    #[must_use]
    pub const fn timeout(after: Duration) -> Self {
        Self::Timeout {
            seconds: after.as_secs(),
        }
    }

    /// Returns `true` for failures worth retrying (transport-level only).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::ApiRequest { .. })
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::Unreachable {
                message: err.to_string(),
            }
        } else if err.is_decode() {
            Self::ResponseParse {
                message: format!("invalid response body: {err}"),
                content: String::new(),
            }
        } else {
            Self::ApiRequest {
                message: err.to_string(),
                status: err.status().map(|s| s.as_u16()),
            }
        }
    }
}

/// Errors raised while embedding a query or searching the vector store.
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    /// The vector store or embedder could not be reached.
    #[error("retrieval backend unreachable: {message}")]
    Unreachable {
        /// Error detail.
        message: String,
    },

    /// The backend answered with an error status.
    #[error("retrieval request failed ({status:?}): {message}")]
    Request {
        /// HTTP status, when available.
        status: Option<u16>,
        /// Error detail.
        message: String,
    },

    /// Embedding the query text failed.
    #[error("embedding failed: {message}")]
    Embedding {
        /// Error detail.
        message: String,
    },

    /// The backend response was malformed.
    #[error("invalid retrieval response: {message}")]
    InvalidResponse {
        /// Error detail.
        message: String,
    },

    /// Invalid retrieval parameters.
    #[error("invalid retrieval parameters: {message}")]
    Validation {
        /// Error detail.
        message: String,
    },
}

impl From<reqwest::Error> for RetrievalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Unreachable {
                message: err.to_string(),
            }
        } else if err.is_decode() {
            Self::InvalidResponse {
                message: err.to_string(),
            }
        } else {
            Self::Request {
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
            }
        }
    }
}

/// Request-level failures of the anomaly pipeline.
///
/// Chunk-level problems (malformed model output, out-of-range indices,
/// individual chunk timeouts) never appear here; they are absorbed as
/// diagnostics unless every chunk fails.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// Bad query shape or `k` out of bounds.
    #[error("validation error: {message}")]
    Validation {
        /// Error detail.
        message: String,
    },

    /// A required upstream could not serve the request.
    #[error("upstream unavailable: {message}")]
    UpstreamUnavailable {
        /// Error detail.
        message: String,
    },

    /// Every chunk call exceeded its deadline.
    #[error("upstream timeout: {message}")]
    UpstreamTimeout {
        /// Error detail.
        message: String,
    },

    /// The request was cancelled before completion.
    #[error("request cancelled")]
    Cancelled,

    /// Unexpected internal failure.
    #[error("internal error: {message}")]
    Internal {
        /// Error detail.
        message: String,
    },
}

impl PipelineError {
    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl From<RetrievalError> for PipelineError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::Validation { message } => Self::Validation { message },
            other => Self::UpstreamUnavailable {
                message: other.to_string(),
            },
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A value is outside its allowed range.
    #[error("invalid configuration: {message}")]
    Invalid {
        /// Error detail.
        message: String,
    },

    /// Unknown LLM provider name.
    #[error("unsupported LLM provider: {name}")]
    UnsupportedProvider {
        /// The configured provider name.
        name: String,
    },
}

/// CLI command errors.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Invalid command-line argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Command execution failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Output formatting failed.
    #[error("output formatting failed: {0}")]
    OutputFormat(String),
}
