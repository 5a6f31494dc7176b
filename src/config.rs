//! Service configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Default Elasticsearch endpoint.
const DEFAULT_ES_HOST: &str = "http://elasticsearch:9200";
/// Default log index name.
const DEFAULT_ES_INDEX: &str = "logs_vector";
/// Default Ollama endpoint.
const DEFAULT_OLLAMA_URL: &str = "http://ollama:11434";
/// Default generation model.
const DEFAULT_MODEL: &str = "phi3";
/// Default embedding model served by Ollama.
const DEFAULT_EMBED_MODEL: &str = "all-minilm";
/// Default `k` for plain retrieval.
const DEFAULT_TOP_K: usize = 8;
/// Default records per LLM call.
const DEFAULT_CHUNK_SIZE: usize = 8;
/// Default maximum concurrent chunk calls.
const DEFAULT_MAX_CONCURRENCY: usize = 4;
/// Default per-chunk LLM deadline in seconds.
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;
/// Default vector-store search deadline in seconds.
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;
/// Default health probe deadline in seconds.
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 2;
/// Default bind address.
const DEFAULT_BIND: &str = "0.0.0.0:8000";
/// Upper bound for `top_k_default`.
const MAX_TOP_K: usize = 100;
/// Upper bound for concurrent chunk calls per request.
pub const MAX_CONCURRENCY: usize = 256;
/// Upper bound for transport retries per chunk.
pub const MAX_RETRIES: u32 = 5;

/// Supported LLM backends.
const PROVIDERS: &[&str] = &["ollama", "openai"];
/// Supported embedding backends.
const EMBED_BACKENDS: &[&str] = &["ollama", "fastembed"];

/// Configuration for the service and the CLI.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Elasticsearch base URL.
    pub es_host: String,
    /// Index holding embedded log lines.
    pub es_index: String,
    /// LLM provider name (`ollama` or `openai`).
    pub llm_provider: String,
    /// Ollama base URL; also the default base for the `openai` provider.
    pub ollama_url: String,
    /// Generation model.
    pub model: String,
    /// API key for OpenAI-compatible endpoints.
    pub api_key: Option<String>,
    /// Base URL for the `openai` provider; defaults to Ollama's `/v1`.
    pub openai_base_url: Option<String>,
    /// Embedding backend (`ollama` or `fastembed`).
    pub embed_backend: String,
    /// Embedding model.
    pub embed_model: String,
    /// Default `k` for `/query`.
    pub top_k_default: usize,
    /// Records per LLM call.
    pub chunk_size: usize,
    /// Maximum concurrent chunk calls per request.
    pub max_concurrency: usize,
    /// Deadline for a single chunk call.
    pub llm_timeout: Duration,
    /// Retries per chunk for transport failures (0 = none).
    pub max_retries: u32,
    /// Deadline for a vector-store search.
    pub store_timeout: Duration,
    /// Deadline for each health probe.
    pub probe_timeout: Duration,
    /// Retrieval cache TTL; zero disables the cache.
    pub cache_ttl: Duration,
    /// Ask the model for a final summary over all raw anomalies.
    pub synthesize_summary: bool,
    /// Directory containing prompt template files.
    pub prompt_dir: Option<PathBuf>,
    /// HTTP bind address.
    pub bind: String,
}

impl AppConfig {
    /// Creates a new builder for `AppConfig`.
    #[must_use]
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a resolved value is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`AppConfig`].
#[derive(Debug, Clone, Default)]
pub struct AppConfigBuilder {
    es_host: Option<String>,
    es_index: Option<String>,
    llm_provider: Option<String>,
    ollama_url: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    openai_base_url: Option<String>,
    embed_backend: Option<String>,
    embed_model: Option<String>,
    top_k_default: Option<usize>,
    chunk_size: Option<usize>,
    max_concurrency: Option<usize>,
    llm_timeout: Option<Duration>,
    max_retries: Option<u32>,
    store_timeout: Option<Duration>,
    probe_timeout: Option<Duration>,
    cache_ttl: Option<Duration>,
    synthesize_summary: Option<bool>,
    prompt_dir: Option<PathBuf>,
    bind: Option<String>,
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_string(name).and_then(|v| v.parse().ok())
}

impl AppConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.es_host.is_none() {
            self.es_host = env_string("ES_HOST");
        }
        if self.es_index.is_none() {
            self.es_index = env_string("ES_INDEX_LOGS");
        }
        if self.llm_provider.is_none() {
            self.llm_provider = env_string("LLM_PROVIDER");
        }
        if self.ollama_url.is_none() {
            self.ollama_url = env_string("OLLAMA_URL");
        }
        if self.model.is_none() {
            self.model = env_string("MODEL");
        }
        if self.api_key.is_none() {
            self.api_key = env_string("OPENAI_API_KEY");
        }
        if self.openai_base_url.is_none() {
            self.openai_base_url = env_string("OPENAI_BASE_URL");
        }
        if self.embed_backend.is_none() {
            self.embed_backend = env_string("EMBED_BACKEND");
        }
        if self.embed_model.is_none() {
            self.embed_model = env_string("EMBED_MODEL");
        }
        if self.top_k_default.is_none() {
            self.top_k_default = env_parse("TOP_K");
        }
        if self.chunk_size.is_none() {
            self.chunk_size = env_parse("CHUNK_SIZE");
        }
        if self.max_concurrency.is_none() {
            self.max_concurrency = env_parse("LOGSIFT_MAX_CONCURRENCY");
        }
        if self.llm_timeout.is_none() {
            self.llm_timeout = env_parse("LOGSIFT_LLM_TIMEOUT_SECS").map(Duration::from_secs);
        }
        if self.max_retries.is_none() {
            self.max_retries = env_parse("LOGSIFT_MAX_RETRIES");
        }
        if self.cache_ttl.is_none() {
            self.cache_ttl = env_parse("LOGSIFT_CACHE_TTL_SECS").map(Duration::from_secs);
        }
        if self.synthesize_summary.is_none() {
            self.synthesize_summary = env_parse("LOGSIFT_SYNTHESIZE_SUMMARY");
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = env_string("LOGSIFT_PROMPT_DIR").map(PathBuf::from);
        }
        if self.bind.is_none() {
            self.bind = env_string("LOGSIFT_BIND");
        }
        self
    }

    /// Sets the Elasticsearch base URL.
    #[must_use]
    pub fn es_host(mut self, host: impl Into<String>) -> Self {
        self.es_host = Some(host.into());
        self
    }

    /// Sets the log index name.
    #[must_use]
    pub fn es_index(mut self, index: impl Into<String>) -> Self {
        self.es_index = Some(index.into());
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn llm_provider(mut self, provider: impl Into<String>) -> Self {
        self.llm_provider = Some(provider.into());
        self
    }

    /// Sets the Ollama base URL.
    #[must_use]
    pub fn ollama_url(mut self, url: impl Into<String>) -> Self {
        self.ollama_url = Some(url.into());
        self
    }

    /// Sets the generation model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL for the `openai` provider.
    #[must_use]
    pub fn openai_base_url(mut self, url: impl Into<String>) -> Self {
        self.openai_base_url = Some(url.into());
        self
    }

    /// Sets the embedding backend.
    #[must_use]
    pub fn embed_backend(mut self, backend: impl Into<String>) -> Self {
        self.embed_backend = Some(backend.into());
        self
    }

    /// Sets the embedding model.
    #[must_use]
    pub fn embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = Some(model.into());
        self
    }

    /// Sets the default `k` for plain retrieval.
    #[must_use]
    pub const fn top_k_default(mut self, k: usize) -> Self {
        self.top_k_default = Some(k);
        self
    }

    /// Sets the chunk size.
    #[must_use]
    pub const fn chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = Some(n);
        self
    }

    /// Sets the maximum concurrency.
    #[must_use]
    pub const fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }

    /// Sets the per-chunk LLM deadline.
    #[must_use]
    pub const fn llm_timeout(mut self, duration: Duration) -> Self {
        self.llm_timeout = Some(duration);
        self
    }

    /// Sets the max retries.
    #[must_use]
    pub const fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Sets the vector-store deadline.
    #[must_use]
    pub const fn store_timeout(mut self, duration: Duration) -> Self {
        self.store_timeout = Some(duration);
        self
    }

    /// Sets the health probe deadline.
    #[must_use]
    pub const fn probe_timeout(mut self, duration: Duration) -> Self {
        self.probe_timeout = Some(duration);
        self
    }

    /// Sets the retrieval cache TTL.
    #[must_use]
    pub const fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Enables or disables the summary synthesis call.
    #[must_use]
    pub const fn synthesize_summary(mut self, enabled: bool) -> Self {
        self.synthesize_summary = Some(enabled);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Sets the HTTP bind address.
    #[must_use]
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind = Some(addr.into());
        self
    }

    /// Builds the [`AppConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero chunk size, a concurrency
    /// outside `1..=256`, a zero LLM timeout, more than 5 retries or a default
    /// `k` outside `1..=100`, and
    /// [`ConfigError::UnsupportedProvider`] for unknown provider names.
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let llm_provider = self
            .llm_provider
            .map_or_else(|| "ollama".to_string(), |p| p.to_lowercase());
        if !PROVIDERS.contains(&llm_provider.as_str()) {
            return Err(ConfigError::UnsupportedProvider { name: llm_provider });
        }

        let embed_backend = self
            .embed_backend
            .map_or_else(|| "ollama".to_string(), |b| b.to_lowercase());
        if !EMBED_BACKENDS.contains(&embed_backend.as_str()) {
            return Err(ConfigError::Invalid {
                message: format!("unknown embedding backend: {embed_backend}"),
            });
        }

        let chunk_size = self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size < 1 {
            return Err(ConfigError::Invalid {
                message: "chunk_size must be at least 1".to_string(),
            });
        }

        let max_concurrency = self.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY);
        if !(1..=MAX_CONCURRENCY).contains(&max_concurrency) {
            return Err(ConfigError::Invalid {
                message: format!("max_concurrency must be between 1 and {MAX_CONCURRENCY}"),
            });
        }

        let llm_timeout = self
            .llm_timeout
            .unwrap_or(Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS));
        if llm_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                message: "llm_timeout must be greater than zero".to_string(),
            });
        }

        let max_retries = self.max_retries.unwrap_or(0);
        if max_retries > MAX_RETRIES {
            return Err(ConfigError::Invalid {
                message: format!("max_retries must be at most {MAX_RETRIES}"),
            });
        }

        let top_k_default = self.top_k_default.unwrap_or(DEFAULT_TOP_K);
        if !(1..=MAX_TOP_K).contains(&top_k_default) {
            return Err(ConfigError::Invalid {
                message: format!("top_k_default must be between 1 and {MAX_TOP_K}"),
            });
        }

        Ok(AppConfig {
            es_host: trim_slash(self.es_host.unwrap_or_else(|| DEFAULT_ES_HOST.to_string())),
            es_index: self.es_index.unwrap_or_else(|| DEFAULT_ES_INDEX.to_string()),
            llm_provider,
            ollama_url: trim_slash(
                self.ollama_url
                    .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            ),
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key: self.api_key,
            openai_base_url: self.openai_base_url.map(trim_slash),
            embed_backend,
            embed_model: self
                .embed_model
                .unwrap_or_else(|| DEFAULT_EMBED_MODEL.to_string()),
            top_k_default,
            chunk_size,
            max_concurrency,
            llm_timeout,
            max_retries,
            store_timeout: self
                .store_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS)),
            probe_timeout: self
                .probe_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS)),
            cache_ttl: self.cache_ttl.unwrap_or(Duration::ZERO),
            synthesize_summary: self.synthesize_summary.unwrap_or(false),
            prompt_dir: self.prompt_dir,
            bind: self.bind.unwrap_or_else(|| DEFAULT_BIND.to_string()),
        })
    }
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
