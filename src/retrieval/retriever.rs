//! Query → ordered candidate set.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::AppConfig;
use crate::core::{CandidateSet, Query, QueryLimits};
use crate::error::RetrievalError;
use crate::retrieval::cache::{DEFAULT_CAPACITY, RetrievalCache};
use crate::retrieval::embedding::{Embedder, create_embedder};
use crate::retrieval::vector_store::{ElasticsearchStore, VectorStore};

/// Embeds queries and runs top-k similarity search.
///
/// Read-only: the only state it owns is the optional cache.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    cache: Option<RetrievalCache>,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("embedder", &self.embedder.name())
            .field("store", &self.store.name())
            .field("cache", &self.cache)
            .finish()
    }
}

impl Retriever {
    /// Creates a retriever without a cache.
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            cache: None,
        }
    }

    /// Attaches a read-through cache.
    #[must_use]
    pub fn with_cache(mut self, cache: RetrievalCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Builds the configured embedder, Elasticsearch store and cache.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] if a backend cannot be constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self, RetrievalError> {
        let embedder = create_embedder(config)?;
        let store = Arc::new(ElasticsearchStore::new(
            &config.es_host,
            config.es_index.clone(),
            config.store_timeout,
        )?);
        let mut retriever = Self::new(embedder, store);
        retriever.cache = RetrievalCache::new(config.cache_ttl, DEFAULT_CAPACITY);
        Ok(retriever)
    }

    /// The vector store, for health probing.
    #[must_use]
    pub fn store(&self) -> Arc<dyn VectorStore> {
        Arc::clone(&self.store)
    }

    /// Returns up to `query.k()` records ordered by descending score.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Validation`] if `k` is outside the retrieval
    /// bounds, and any embedder or store failure otherwise.
    pub async fn retrieve(&self, query: &Query) -> Result<CandidateSet, RetrievalError> {
        let k = query.k();
        if !(1..=QueryLimits::RETRIEVAL.max_k).contains(&k) {
            return Err(RetrievalError::Validation {
                message: format!(
                    "k must be between 1 and {}, got {k}",
                    QueryLimits::RETRIEVAL.max_k
                ),
            });
        }

        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get(query.text(), k)) {
            debug!(k, hits = cached.len(), "retrieval cache hit");
            return Ok(cached);
        }

        let started = Instant::now();
        let embedding = self.embedder.embed(query.text()).await?;
        let hits = self.store.similarity_search(&embedding, k).await?;
        let candidates = CandidateSet::from_hits(hits, k);

        info!(
            query = query.text(),
            k,
            hits = candidates.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "retrieved candidates"
        );

        if let Some(cache) = &self.cache {
            cache.insert(query.text(), k, candidates.clone());
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::core::ScoredHit;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, RetrievalError> {
            Ok(vec![1.0, 0.0])
        }
    }

    #[derive(Default)]
    struct CountingStore {
        calls: AtomicUsize,
        down: bool,
    }

    #[async_trait]
    impl VectorStore for CountingStore {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn similarity_search(
            &self,
            _embedding: &[f32],
            k: usize,
        ) -> Result<Vec<ScoredHit>, RetrievalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.down {
                return Err(RetrievalError::Unreachable {
                    message: "connection refused".to_string(),
                });
            }
            // Deliberately unsorted and longer than k.
            Ok((0..k + 3)
                .map(|i| ScoredHit {
                    score: (i % 4) as f64,
                    text: Some(format!("line {i}")),
                    ..ScoredHit::default()
                })
                .collect())
        }

        async fn ping(&self) -> Result<(), RetrievalError> {
            Ok(())
        }
    }

    fn query(k: i64) -> Query {
        Query::new("disk errors", k, QueryLimits::RETRIEVAL).unwrap_or_else(|_| unreachable!())
    }

    #[tokio::test]
    async fn test_retrieve_orders_and_bounds() {
        let retriever = Retriever::new(Arc::new(FixedEmbedder), Arc::new(CountingStore::default()));
        let set = retriever
            .retrieve(&query(5))
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(set.len(), 5);
        for pair in set.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let store = CountingStore {
            down: true,
            ..CountingStore::default()
        };
        let retriever = Retriever::new(Arc::new(FixedEmbedder), Arc::new(store));
        let result = retriever.retrieve(&query(3)).await;
        assert!(matches!(result, Err(RetrievalError::Unreachable { .. })));
    }

    #[tokio::test]
    async fn test_cache_skips_second_search() {
        let store = Arc::new(CountingStore::default());
        let cache =
            RetrievalCache::new(Duration::from_secs(60), 8).unwrap_or_else(|| unreachable!());
        let retriever = Retriever::new(Arc::new(FixedEmbedder), store.clone()).with_cache(cache);

        let first = retriever.retrieve(&query(4)).await.unwrap_or_default();
        let second = retriever.retrieve(&query(4)).await.unwrap_or_default();
        assert_eq!(first, second);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }
}
