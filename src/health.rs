//! Dependency reachability.
//!
//! Probes are injected capabilities so the HTTP layer can be exercised with
//! fakes. The report reflects whether the vector store and the LLM service
//! answer, not whether the pipeline produces correct results.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::llm::LlmProvider;
use crate::retrieval::VectorStore;

/// A pollable reachability check for one dependency.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Dependency name for logging.
    fn name(&self) -> &'static str;

    /// Returns `true` if the dependency answered successfully.
    async fn check(&self) -> bool;
}

/// Probes the vector store.
pub struct StoreHealth(pub Arc<dyn VectorStore>);

#[async_trait]
impl HealthProbe for StoreHealth {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    async fn check(&self) -> bool {
        match self.0.ping().await {
            Ok(()) => true,
            Err(e) => {
                debug!(probe = self.name(), error = %e, "health probe failed");
                false
            }
        }
    }
}

/// Probes the LLM service.
pub struct LlmHealth(pub Arc<dyn LlmProvider>);

#[async_trait]
impl HealthProbe for LlmHealth {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    async fn check(&self) -> bool {
        match self.0.ping().await {
            Ok(()) => true,
            Err(e) => {
                debug!(probe = self.name(), error = %e, "health probe failed");
                false
            }
        }
    }
}

/// Overall status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every dependency answered.
    Healthy,
    /// At least one dependency did not answer.
    Degraded,
}

/// Result of one health poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Vector store reachable.
    pub elasticsearch: bool,
    /// LLM service reachable.
    pub ollama: bool,
    /// `healthy` only if both are reachable.
    pub status: HealthStatus,
}

/// Runs both probes concurrently, each under its own deadline.
pub struct HealthChecker {
    store: Arc<dyn HealthProbe>,
    llm: Arc<dyn HealthProbe>,
    timeout: Duration,
}

impl HealthChecker {
    /// Creates a checker from two probes.
    #[must_use]
    pub fn new(store: Arc<dyn HealthProbe>, llm: Arc<dyn HealthProbe>, timeout: Duration) -> Self {
        Self {
            store,
            llm,
            timeout,
        }
    }

    /// Polls both dependencies. A probe that exceeds the deadline counts as
    /// unreachable.
    pub async fn check(&self) -> HealthReport {
        let (elasticsearch, ollama) = tokio::join!(
            probe(self.store.as_ref(), self.timeout),
            probe(self.llm.as_ref(), self.timeout)
        );
        HealthReport {
            elasticsearch,
            ollama,
            status: if elasticsearch && ollama {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            },
        }
    }
}

impl std::fmt::Debug for HealthChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthChecker")
            .field("store", &self.store.name())
            .field("llm", &self.llm.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

async fn probe(probe: &dyn HealthProbe, timeout: Duration) -> bool {
    tokio::time::timeout(timeout, probe.check())
        .await
        .unwrap_or_else(|_| {
            debug!(probe = probe.name(), "health probe timed out");
            false
        })
}
