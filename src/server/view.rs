//! Public JSON shapes.
//!
//! The pipeline types carry one field per fact; the duplicated display
//! keys and the `"n/a"` thread placeholder exist only here.

use serde::Serialize;

use crate::core::{LogLevel, LogRecord, Severity};
use crate::pipeline::{AnalysisResult, ConfirmedAnomaly, RawAnomaly};

/// Placeholder for records without a thread.
const NO_THREAD: &str = "n/a";

/// One `/query` hit.
#[derive(Debug, Clone, Serialize)]
pub struct HitView {
    /// Similarity score.
    pub score: f64,
    /// Timestamp as stored.
    pub timestamp: String,
    /// Log level.
    pub level: LogLevel,
    /// Thread name.
    pub thread: String,
    /// Parsed message.
    pub message: String,
    /// Full raw line.
    pub text: String,
}

impl From<&LogRecord> for HitView {
    fn from(record: &LogRecord) -> Self {
        Self {
            score: record.score,
            timestamp: record.timestamp.clone(),
            level: record.level,
            thread: record.thread.clone(),
            message: record.message.clone(),
            text: record.raw_text.clone(),
        }
    }
}

/// A model claim as reported, with its claimed global index.
#[derive(Debug, Clone, Serialize)]
pub struct RawAnomalyView {
    /// Claimed global index; may point outside the candidate set.
    pub i: i64,
    /// Model-supplied reason.
    pub reason: String,
    /// Model-supplied severity.
    pub severity: Severity,
}

impl From<&RawAnomaly> for RawAnomalyView {
    fn from(raw: &RawAnomaly) -> Self {
        Self {
            i: raw.claimed_global_index(),
            reason: raw.reason.clone(),
            severity: raw.severity,
        }
    }
}

/// A confirmed anomaly with display aliases.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmedAnomalyView {
    /// Global index of the record.
    pub i: usize,
    /// Record timestamp.
    pub timestamp: String,
    /// Display alias of `timestamp`.
    #[serde(rename = "timestamp (when)")]
    pub timestamp_when: String,
    /// Record thread, `"n/a"` when missing.
    pub thread: String,
    /// Display alias of `thread`.
    #[serde(rename = "thread (where)")]
    pub thread_where: String,
    /// Raw log line.
    pub text: String,
    /// Display alias of `text`.
    #[serde(rename = "text (message)")]
    pub text_message: String,
    /// Record level.
    pub level: LogLevel,
    /// Similarity score.
    pub score: f64,
    /// Model-supplied reason.
    pub reason: String,
    /// Model-supplied severity.
    pub severity: Severity,
    /// Follow-up.
    pub next_action: String,
}

impl From<&ConfirmedAnomaly> for ConfirmedAnomalyView {
    fn from(anomaly: &ConfirmedAnomaly) -> Self {
        let record = &anomaly.record;
        let thread = if record.thread.trim().is_empty() {
            NO_THREAD.to_string()
        } else {
            record.thread.clone()
        };
        Self {
            i: record.global_index,
            timestamp: record.timestamp.clone(),
            timestamp_when: record.timestamp.clone(),
            thread_where: thread.clone(),
            thread,
            text: record.raw_text.clone(),
            text_message: record.raw_text.clone(),
            level: record.level,
            score: record.score,
            reason: anomaly.reason.clone(),
            severity: anomaly.severity,
            next_action: anomaly.next_action.clone(),
        }
    }
}

/// `/anomalies` response body.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisView {
    /// Report summary.
    pub summary: String,
    /// Every parsed claim, pre-dedup.
    pub raw_anomalies: Vec<RawAnomalyView>,
    /// Deduplicated confirmed anomalies.
    pub confirmed_anomalies: Vec<ConfirmedAnomalyView>,
    /// Flagged vs verified counts in plain language.
    pub layman_explanation: String,
    /// Chunks sent to the model.
    pub chunks_total: usize,
    /// Chunks whose call failed or timed out.
    pub chunks_failed: usize,
    /// Number of absorbed problems.
    pub diagnostics: usize,
    /// Request time in seconds.
    pub elapsed: f64,
}

impl From<&AnalysisResult> for AnalysisView {
    fn from(result: &AnalysisResult) -> Self {
        Self {
            summary: result.summary.clone(),
            raw_anomalies: result.raw_anomalies.iter().map(RawAnomalyView::from).collect(),
            confirmed_anomalies: result
                .confirmed_anomalies
                .iter()
                .map(ConfirmedAnomalyView::from)
                .collect(),
            layman_explanation: result.layman_explanation.clone(),
            chunks_total: result.stats.chunks_total,
            chunks_failed: result.stats.chunks_failed,
            diagnostics: result.stats.diagnostics.len(),
            elapsed: result.stats.elapsed.as_secs_f64(),
        }
    }
}
