//! HTTP surface.
//!
//! Three routes over one shared, read-only [`AppState`]. Every request gets
//! its own pipeline run; nothing mutable is shared between requests except
//! the optional retrieval cache.

pub mod error;
pub mod handlers;
pub mod view;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::health::{HealthChecker, LlmHealth, StoreHealth};
use crate::llm::create_provider;
use crate::pipeline::AnomalyPipeline;
use crate::retrieval::Retriever;

pub use error::{ApiError, ErrorResponse};
pub use handlers::{DEFAULT_ANOMALY_QUERY, QueryRequest};

/// Shared request state.
#[derive(Debug)]
pub struct AppState {
    /// The analysis pipeline.
    pub pipeline: AnomalyPipeline,
    /// Dependency probes.
    pub health: HealthChecker,
}

impl AppState {
    /// Creates state from prebuilt parts.
    #[must_use]
    pub const fn new(pipeline: AnomalyPipeline, health: HealthChecker) -> Self {
        Self { pipeline, health }
    }

    /// Builds the provider, retriever, pipeline and probes from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if a backend cannot be constructed.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let provider = create_provider(&config)?;
        let retriever = Arc::new(Retriever::from_config(&config)?);
        let probe_timeout = config.probe_timeout;
        let pipeline = AnomalyPipeline::new(provider, retriever, config);
        let health = HealthChecker::new(
            Arc::new(StoreHealth(pipeline.retriever().store())),
            Arc::new(LlmHealth(pipeline.provider())),
            probe_timeout,
        );
        Ok(Self::new(pipeline, health))
    }
}

/// Builds the router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/query", post(handlers::query))
        .route("/anomalies", post(handlers::anomalies))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the API on `config.bind` until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the state cannot be built, the address cannot be
/// bound, or the server fails.
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let addr = config.bind.clone();
    let state = Arc::new(AppState::from_config(config)?);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "logsift listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;

    Ok(())
}
