//! Query embedding backends.
//!
//! The query must land in the same vector space the index was built with,
//! so the backend and model are configuration, never guessed.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::config::AppConfig;
use crate::error::RetrievalError;

/// Turns text into a dense vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Embeds `text`.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] when the backend is unreachable or
    /// answers without a usable vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError>;
}

/// Embedder backed by Ollama's `/api/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaEmbedder {
    /// Creates an embedder for the given Ollama base URL and model.
    #[must_use]
    pub fn new(base_url: &str, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/api/embeddings", base_url.trim_end_matches('/')),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let body = json!({
            "model": self.model,
            "prompt": text,
        });

        let response: Value = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        extract_embedding_vector(&response)
    }
}

/// Finds the embedding vector in an embeddings response.
fn extract_embedding_vector(response: &Value) -> Result<Vec<f32>, RetrievalError> {
    let candidate_paths = ["/embedding", "/embeddings/0", "/data/0/embedding"];

    for path in candidate_paths {
        if let Some(value) = response.pointer(path)
            && let Some(vector) = value_to_embedding_vector(value)
        {
            return Ok(vector);
        }
    }

    Err(RetrievalError::Embedding {
        message: "missing embedding vector in response body".to_string(),
    })
}

#[allow(clippy::cast_possible_truncation)]
fn value_to_embedding_vector(value: &Value) -> Option<Vec<f32>> {
    let values = value.as_array()?;
    if values.is_empty() {
        return None;
    }

    let mut embedding = Vec::with_capacity(values.len());
    for item in values {
        let number = item.as_f64()?;
        if !number.is_finite() {
            return None;
        }
        embedding.push(number as f32);
    }
    Some(embedding)
}

#[cfg(feature = "fastembed-embeddings")]
mod local {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

    use super::Embedder;
    use crate::error::RetrievalError;

    /// In-process all-MiniLM-L6-v2 embedder (384 dimensions).
    pub struct FastEmbedder {
        model: Arc<Mutex<TextEmbedding>>,
    }

    impl FastEmbedder {
        /// Loads the model, downloading it on first use.
        ///
        /// # Errors
        ///
        /// Returns [`RetrievalError::Embedding`] if the model cannot be loaded.
        pub fn new() -> Result<Self, RetrievalError> {
            let model = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::AllMiniLML6V2))
                .map_err(|e| RetrievalError::Embedding {
                    message: format!("failed to load fastembed model: {e}"),
                })?;
            Ok(Self {
                model: Arc::new(Mutex::new(model)),
            })
        }
    }

    #[async_trait]
    impl Embedder for FastEmbedder {
        fn name(&self) -> &'static str {
            "fastembed"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
            let model = Arc::clone(&self.model);
            let text = text.to_string();
            tokio::task::spawn_blocking(move || {
                let mut guard = model.lock().map_err(|e| RetrievalError::Embedding {
                    message: format!("embedding model lock poisoned: {e}"),
                })?;
                let mut vectors =
                    guard
                        .embed(vec![text], None)
                        .map_err(|e| RetrievalError::Embedding {
                            message: e.to_string(),
                        })?;
                vectors.pop().ok_or_else(|| RetrievalError::Embedding {
                    message: "fastembed returned no vectors".to_string(),
                })
            })
            .await
            .map_err(|e| RetrievalError::Embedding {
                message: format!("embedding task failed: {e}"),
            })?
        }
    }
}

#[cfg(feature = "fastembed-embeddings")]
pub use local::FastEmbedder;

/// Creates the configured [`Embedder`].
///
/// # Errors
///
/// Returns [`RetrievalError::Embedding`] when `fastembed` is requested but
/// the crate was built without the `fastembed-embeddings` feature, or the
/// local model fails to load.
pub fn create_embedder(config: &AppConfig) -> Result<Arc<dyn Embedder>, RetrievalError> {
    match config.embed_backend.as_str() {
        #[cfg(feature = "fastembed-embeddings")]
        "fastembed" => Ok(Arc::new(FastEmbedder::new()?)),
        #[cfg(not(feature = "fastembed-embeddings"))]
        "fastembed" => Err(RetrievalError::Embedding {
            message: "built without the fastembed-embeddings feature".to_string(),
        }),
        _ => Ok(Arc::new(OllamaEmbedder::new(
            &config.ollama_url,
            config.embed_model.clone(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_legacy_embedding() {
        let response = json!({"embedding": [0.1, 0.2, 0.3]});
        let vector = extract_embedding_vector(&response).unwrap_or_default();
        assert_eq!(vector.len(), 3);
        assert!((vector[1] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_extract_batched_embedding() {
        let response = json!({"embeddings": [[1.0, 0.0]]});
        let vector = extract_embedding_vector(&response).unwrap_or_default();
        assert_eq!(vector, vec![1.0, 0.0]);
    }

    #[test]
    fn test_extract_rejects_empty_and_garbage() {
        assert!(extract_embedding_vector(&json!({"embedding": []})).is_err());
        assert!(extract_embedding_vector(&json!({"embedding": ["a"]})).is_err());
        assert!(extract_embedding_vector(&json!({"other": 1})).is_err());
    }

    #[test]
    fn test_endpoint_construction() {
        let embedder = OllamaEmbedder::new("http://ollama:11434/", "all-minilm");
        assert_eq!(embedder.endpoint, "http://ollama:11434/api/embeddings");
        assert_eq!(embedder.name(), "ollama");
    }

    #[test]
    fn test_create_default_embedder() {
        let config = AppConfig::builder()
            .build()
            .unwrap_or_else(|_| unreachable!());
        let embedder = create_embedder(&config).unwrap_or_else(|_| unreachable!());
        assert_eq!(embedder.name(), "ollama");
    }
}
