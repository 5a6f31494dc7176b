//! Vector store client.
//!
//! Only similarity search and reachability are needed here; index
//! construction lives outside this crate.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::core::ScoredHit;
use crate::error::RetrievalError;

/// Source fields requested for every hit.
const SOURCE_FIELDS: &[&str] = &["timestamp", "level", "thread", "message", "text"];

/// k-nearest-neighbour search over embedded log lines.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store name for logging.
    fn name(&self) -> &'static str;

    /// Returns up to `k` hits ordered by descending similarity.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] if the store cannot be queried.
    async fn similarity_search(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredHit>, RetrievalError>;

    /// Checks that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] if the store does not answer successfully.
    async fn ping(&self) -> Result<(), RetrievalError>;
}

/// Elasticsearch-backed store using a `script_score` cosine query over the
/// `embedding` dense-vector field.
#[derive(Debug, Clone)]
pub struct ElasticsearchStore {
    client: reqwest::Client,
    host: String,
    index: String,
}

impl ElasticsearchStore {
    /// Creates a store client with a per-request deadline.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Request`] if the HTTP client cannot be built.
    pub fn new(
        host: &str,
        index: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RetrievalError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RetrievalError::Request {
                status: None,
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            index: index.into(),
        })
    }

    /// Builds the `_search` body. Scores are `cosine + 1.0` so they stay
    /// non-negative, as Elasticsearch requires.
    fn search_body(embedding: &[f32], k: usize) -> Value {
        json!({
            "size": k,
            "query": {
                "script_score": {
                    "query": {"match_all": {}},
                    "script": {
                        "source": "cosineSimilarity(params.query_vector,'embedding')+1.0",
                        "params": {"query_vector": embedding}
                    }
                }
            },
            "_source": SOURCE_FIELDS,
        })
    }

    fn parse_hits(response: &Value) -> Result<Vec<ScoredHit>, RetrievalError> {
        let hits = response
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .ok_or_else(|| RetrievalError::InvalidResponse {
                message: "missing hits.hits array".to_string(),
            })?;

        let field = |source: Option<&Value>, key: &str| -> Option<String> {
            source.and_then(|s| s.get(key)).and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
        };

        Ok(hits
            .iter()
            .map(|hit| {
                let source = hit.get("_source");
                ScoredHit {
                    score: hit.get("_score").and_then(Value::as_f64).unwrap_or(0.0),
                    timestamp: field(source, "timestamp"),
                    level: field(source, "level"),
                    thread: field(source, "thread"),
                    message: field(source, "message"),
                    text: field(source, "text"),
                }
            })
            .collect())
    }
}

#[async_trait]
impl VectorStore for ElasticsearchStore {
    fn name(&self) -> &'static str {
        "elasticsearch"
    }

    async fn similarity_search(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredHit>, RetrievalError> {
        let url = format!("{}/{}/_search", self.host, self.index);
        let response: Value = self
            .client
            .post(&url)
            .json(&Self::search_body(embedding, k))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Self::parse_hits(&response)
    }

    async fn ping(&self) -> Result<(), RetrievalError> {
        let url = format!("{}/_cluster/health", self.host);
        self.client.get(&url).send().await?.error_for_status()?;
        Ok(())
    }
}
