//! Route handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;

use super::AppState;
use super::error::ApiError;
use super::view::{AnalysisView, HitView};
use crate::core::{Query, QueryLimits};
use crate::health::HealthReport;

/// Query text used by `/anomalies` when the body omits one.
pub const DEFAULT_ANOMALY_QUERY: &str = "recent anomalies";

/// Request body for `/query` and `/anomalies`.
#[derive(Debug, Default, Deserialize)]
pub struct QueryRequest {
    /// Natural-language query.
    pub query: Option<String>,
    /// Number of candidates to retrieve.
    pub k: Option<i64>,
}

/// `POST /query`: semantic retrieval without analysis.
pub async fn query(
    State(state): State<Arc<AppState>>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Vec<HitView>>, ApiError> {
    let Json(req) = body?;
    let default_k = i64::try_from(state.pipeline.config().top_k_default).unwrap_or(i64::MAX);
    let query = Query::new(
        req.query.unwrap_or_default(),
        req.k.unwrap_or(default_k),
        QueryLimits::RETRIEVAL,
    )?;

    let candidates = state.pipeline.retrieve(&query).await?;
    Ok(Json(candidates.iter().map(HitView::from).collect()))
}

/// `POST /anomalies`: the full analysis pipeline.
pub async fn anomalies(
    State(state): State<Arc<AppState>>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<AnalysisView>, ApiError> {
    let Json(req) = body?;
    let default_k = i64::try_from(QueryLimits::ANALYSIS.max_k).unwrap_or(i64::MAX);
    let query = Query::new(
        req.query.unwrap_or_else(|| DEFAULT_ANOMALY_QUERY.to_string()),
        req.k.unwrap_or(default_k),
        QueryLimits::ANALYSIS,
    )?;

    let result = state.pipeline.analyze(&query).await?;
    Ok(Json(AnalysisView::from(&result)))
}

/// `GET /health`: dependency reachability.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    Json(state.health.check().await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_fields_optional() {
        let req: QueryRequest = serde_json::from_str("{}").unwrap_or_else(|_| unreachable!());
        assert!(req.query.is_none());
        assert!(req.k.is_none());
    }

    #[test]
    fn test_request_rejects_fractional_k() {
        let parsed = serde_json::from_str::<QueryRequest>(r#"{"query": "x", "k": 2.5}"#);
        assert!(parsed.is_err());
    }
}
