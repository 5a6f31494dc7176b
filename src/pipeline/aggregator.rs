//! Folds per-chunk results into the final report.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt::Write;

use super::types::{AnalysisResult, ConfirmedAnomaly, RawAnomaly, RunStats};
use crate::core::CandidateSet;

/// Inputs for the report summary, in order of preference.
#[derive(Debug, Clone, Default)]
pub struct SummarySource {
    /// Summary produced by the summary call, if it ran and succeeded.
    pub synthesized: Option<String>,
    /// Per-chunk summaries from the extractor, in chunk order.
    pub chunk_summaries: Vec<String>,
}

/// Keeps one anomaly per global index: the most severe, first seen on ties.
///
/// The result is ordered by global index.
#[must_use]
pub fn dedup(confirmed: Vec<ConfirmedAnomaly>) -> Vec<ConfirmedAnomaly> {
    let mut by_index: BTreeMap<usize, ConfirmedAnomaly> = BTreeMap::new();
    for anomaly in confirmed {
        match by_index.entry(anomaly.global_index()) {
            Entry::Vacant(slot) => {
                slot.insert(anomaly);
            }
            Entry::Occupied(mut slot) => {
                if anomaly.severity > slot.get().severity {
                    slot.insert(anomaly);
                }
            }
        }
    }
    by_index.into_values().collect()
}

/// Plain-language flagged vs verified counts.
#[must_use]
pub fn layman_explanation(flagged: usize, verified: usize) -> String {
    format!("The model flagged {flagged} issue(s); {verified} were verified in your logs.")
}

/// Deterministic summary derived from the anomalies found.
#[must_use]
pub fn template_summary(
    candidates: usize,
    raw: &[RawAnomaly],
    confirmed: &[ConfirmedAnomaly],
) -> String {
    let Some(worst) = confirmed
        .iter()
        .map(|a| a.severity)
        .chain(raw.iter().map(|a| a.severity))
        .max()
    else {
        return format!("No anomalies were flagged among {candidates} retrieved log line(s).");
    };

    let mut summary = format!(
        "{} anomaly claim(s) across {candidates} retrieved log line(s); {} confirmed, highest severity {worst}.",
        raw.len(),
        confirmed.len()
    );
    if let Some(top) = confirmed.iter().find(|a| a.severity == worst) {
        let _ = write!(summary, " Most severe: {}", top.reason);
        if !top.reason.ends_with('.') {
            summary.push('.');
        }
    }
    summary
}

/// Builds the report.
///
/// `raw` is reported pre-dedup in claimed global-index order (stable, so
/// claims on the same index keep chunk order). `confirmed` is deduplicated.
#[must_use]
pub fn aggregate(
    candidates: &CandidateSet,
    mut raw: Vec<RawAnomaly>,
    confirmed: Vec<ConfirmedAnomaly>,
    summary: SummarySource,
    stats: RunStats,
) -> AnalysisResult {
    raw.sort_by_key(RawAnomaly::claimed_global_index);
    let confirmed = dedup(confirmed);

    let joined = summary
        .chunk_summaries
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<&str>>()
        .join(" ");

    let summary = summary
        .synthesized
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| (!joined.is_empty()).then_some(joined))
        .unwrap_or_else(|| template_summary(candidates.len(), &raw, &confirmed));

    let layman_explanation = layman_explanation(raw.len(), confirmed.len());

    AnalysisResult {
        summary,
        raw_anomalies: raw,
        confirmed_anomalies: confirmed,
        layman_explanation,
        stats,
    }
}
