//! End-to-end pipeline scenarios against fake collaborators.

mod common;

use std::time::Duration;

use common::{EMPTY, LinesStore, Reply, ScriptedProvider, config, pipeline};
use logsift::core::{Query, QueryLimits, Severity};
use logsift::error::PipelineError;
use logsift::pipeline::Diagnostic;
use tokio_util::sync::CancellationToken;

fn query(k: i64) -> Query {
    Query::new("disk errors", k, QueryLimits::ANALYSIS).unwrap_or_else(|_| unreachable!())
}

fn text(s: &str) -> Reply {
    Reply::Text(s.to_string())
}

const SHORT: Duration = Duration::from_millis(200);

#[tokio::test]
async fn test_local_index_maps_to_global_record() {
    let provider = ScriptedProvider::new(text(EMPTY)).on_line(
        2,
        text(r#"{"summary": "io trouble", "anomalies": [{"i": 1, "reason": "disk full", "severity": "high"}]}"#),
    );
    let pipeline = pipeline(provider, LinesStore { count: 5, up: true }, config(2, SHORT));

    let report = pipeline.analyze(&query(5)).await.unwrap_or_else(|_| unreachable!());

    assert_eq!(report.stats.chunks_total, 3);
    assert_eq!(report.stats.chunks_failed, 0);
    assert_eq!(report.confirmed_anomalies.len(), 1);
    let confirmed = &report.confirmed_anomalies[0];
    assert_eq!(confirmed.global_index(), 3);
    assert_eq!(confirmed.record.raw_text, "line-3");
    assert_eq!(confirmed.severity, Severity::High);
    assert_eq!(confirmed.next_action, "Escalate immediately");
    assert_eq!(report.summary, "io trouble");
}

#[tokio::test]
async fn test_out_of_range_claim_is_dropped() {
    let provider = ScriptedProvider::new(text(EMPTY)).on_line(
        0,
        text(r#"{"anomalies": [{"i": 5, "reason": "y", "severity": "low"}]}"#),
    );
    let pipeline = pipeline(provider, LinesStore { count: 5, up: true }, config(2, SHORT));

    let report = pipeline.analyze(&query(5)).await.unwrap_or_else(|_| unreachable!());

    assert!(report.confirmed_anomalies.is_empty());
    assert_eq!(report.raw_anomalies.len(), 1);
    assert_eq!(report.raw_anomalies[0].claimed_global_index(), 5);
    assert!(report.stats.diagnostics.iter().any(|d| matches!(
        d,
        Diagnostic::IndexOutOfRange {
            chunk_index: 0,
            local_index: 5,
            chunk_len: 2
        }
    )));
    assert_eq!(
        report.layman_explanation,
        "The model flagged 1 issue(s); 0 were verified in your logs."
    );
}

#[tokio::test]
async fn test_one_chunk_timeout_keeps_partial_results() {
    let provider = ScriptedProvider::new(text(EMPTY))
        .on_line(0, Reply::Hang)
        .on_line(2, text(r#"{"anomalies": [{"i": 0, "reason": "oom", "severity": "medium"}]}"#));
    let pipeline = pipeline(provider, LinesStore { count: 4, up: true }, config(2, SHORT));

    let report = pipeline.analyze(&query(4)).await.unwrap_or_else(|_| unreachable!());

    assert_eq!(report.stats.chunks_total, 2);
    assert_eq!(report.stats.chunks_failed, 1);
    assert!(
        report
            .stats
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::ChunkTimedOut { chunk_index: 0 }))
    );
    assert_eq!(report.confirmed_anomalies.len(), 1);
    assert_eq!(report.confirmed_anomalies[0].global_index(), 2);
}

#[tokio::test]
async fn test_all_chunks_timing_out_is_upstream_timeout() {
    let provider = ScriptedProvider::new(Reply::Hang);
    let pipeline = pipeline(provider, LinesStore { count: 4, up: true }, config(2, SHORT));

    let result = pipeline.analyze(&query(4)).await;

    assert!(matches!(result, Err(PipelineError::UpstreamTimeout { .. })));
}

#[tokio::test]
async fn test_all_chunks_failing_mixed_is_upstream_unavailable() {
    let provider = ScriptedProvider::new(Reply::Fail).on_line(0, Reply::Hang);
    let pipeline = pipeline(provider, LinesStore { count: 4, up: true }, config(2, SHORT));

    let result = pipeline.analyze(&query(4)).await;

    assert!(matches!(result, Err(PipelineError::UpstreamUnavailable { .. })));
}

#[tokio::test]
async fn test_malformed_reply_is_absorbed() {
    let provider = ScriptedProvider::new(text("I could not find anything, sorry."));
    let pipeline = pipeline(provider, LinesStore { count: 3, up: true }, config(8, SHORT));

    let report = pipeline.analyze(&query(3)).await.unwrap_or_else(|_| unreachable!());

    assert_eq!(report.stats.chunks_failed, 0);
    assert!(report.raw_anomalies.is_empty());
    assert!(
        report
            .stats
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::ParseError { chunk_index: 0, .. }))
    );
    assert!(report.summary.starts_with("No anomalies"));
}

#[tokio::test]
async fn test_textless_responses_are_absorbed() {
    let provider = ScriptedProvider::new(Reply::Textless);
    let pipeline = pipeline(provider, LinesStore { count: 4, up: true }, config(2, SHORT));

    let report = pipeline.analyze(&query(4)).await.unwrap_or_else(|_| unreachable!());

    assert_eq!(report.stats.chunks_total, 2);
    assert_eq!(report.stats.chunks_failed, 0);
    assert!(report.confirmed_anomalies.is_empty());
    let parse_errors = report
        .stats
        .diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::ParseError { .. }))
        .count();
    assert_eq!(parse_errors, 2);
}

#[tokio::test]
async fn test_results_ordered_when_chunks_finish_out_of_order() {
    let provider = ScriptedProvider::new(text(EMPTY))
        .on_line(
            0,
            Reply::Delayed(
                Duration::from_millis(300),
                r#"{"anomalies": [{"i": 1, "reason": "first chunk", "severity": "low"}]}"#
                    .to_string(),
            ),
        )
        .on_line(
            2,
            Reply::Delayed(
                Duration::from_millis(100),
                r#"{"anomalies": [{"i": 0, "reason": "second chunk", "severity": "medium"}]}"#
                    .to_string(),
            ),
        )
        .on_line(
            4,
            text(r#"{"anomalies": [{"i": 1, "reason": "third chunk", "severity": "high"}]}"#),
        );
    let mut cfg = config(2, Duration::from_secs(5));
    cfg.max_concurrency = 3;
    let pipeline = pipeline(provider, LinesStore { count: 6, up: true }, cfg);

    let report = pipeline.analyze(&query(6)).await.unwrap_or_else(|_| unreachable!());

    assert_eq!(report.stats.chunks_total, 3);
    assert_eq!(report.stats.chunks_failed, 0);
    let raw: Vec<i64> = report
        .raw_anomalies
        .iter()
        .map(|a| a.claimed_global_index())
        .collect();
    assert_eq!(raw, vec![1, 2, 5]);
    let confirmed: Vec<(usize, &str)> = report
        .confirmed_anomalies
        .iter()
        .map(|a| (a.global_index(), a.reason.as_str()))
        .collect();
    assert_eq!(
        confirmed,
        vec![(1, "first chunk"), (2, "second chunk"), (5, "third chunk")]
    );
}

#[tokio::test]
async fn test_duplicate_claims_keep_highest_severity() {
    let provider = ScriptedProvider::new(text(
        r#"{"anomalies": [
            {"i": 1, "reason": "slow", "severity": "low"},
            {"i": 1, "reason": "crash", "severity": "high"},
            {"i": 0, "reason": "warn", "severity": "medium"}
        ]}"#,
    ));
    let pipeline = pipeline(provider, LinesStore { count: 3, up: true }, config(8, SHORT));

    let report = pipeline.analyze(&query(3)).await.unwrap_or_else(|_| unreachable!());

    assert_eq!(report.raw_anomalies.len(), 3);
    let indices: Vec<usize> = report
        .confirmed_anomalies
        .iter()
        .map(|a| a.global_index())
        .collect();
    assert_eq!(indices, vec![0, 1]);
    assert_eq!(report.confirmed_anomalies[1].reason, "crash");
}

#[tokio::test]
async fn test_empty_candidates_yield_empty_report() {
    let provider = ScriptedProvider::new(Reply::Fail);
    let pipeline = pipeline(provider, LinesStore { count: 0, up: true }, config(2, SHORT));

    let report = pipeline.analyze(&query(8)).await.unwrap_or_else(|_| unreachable!());

    assert_eq!(report.stats.chunks_total, 0);
    assert!(report.raw_anomalies.is_empty());
    assert!(report.confirmed_anomalies.is_empty());
}

#[tokio::test]
async fn test_retrieval_failure_is_fatal() {
    let provider = ScriptedProvider::new(text(EMPTY));
    let pipeline = pipeline(provider, LinesStore { count: 4, up: false }, config(2, SHORT));

    let result = pipeline.analyze(&query(4)).await;

    assert!(matches!(result, Err(PipelineError::UpstreamUnavailable { .. })));
}

#[tokio::test]
async fn test_cancellation_aborts_in_flight_calls() {
    let provider = ScriptedProvider::new(Reply::Hang);
    let pipeline = pipeline(
        provider,
        LinesStore { count: 4, up: true },
        config(2, Duration::from_secs(60)),
    );
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        pipeline.analyze_until(&query(4), &token),
    )
    .await
    .unwrap_or_else(|_| unreachable!());

    assert!(matches!(result, Err(PipelineError::Cancelled)));
}

#[tokio::test]
async fn test_synthesized_summary_preferred() {
    let provider = ScriptedProvider::new(text(
        r#"{"summary": "chunk note", "anomalies": [{"i": 0, "reason": "disk", "severity": "high"}]}"#,
    ))
    .on("<anomalies>", text("Disk failures dominate."));
    let mut cfg = config(8, SHORT);
    cfg.synthesize_summary = true;
    let pipeline = pipeline(provider, LinesStore { count: 2, up: true }, cfg);

    let report = pipeline.analyze(&query(2)).await.unwrap_or_else(|_| unreachable!());

    assert_eq!(report.summary, "Disk failures dominate.");
}

#[tokio::test]
async fn test_failed_summary_falls_back_to_chunk_notes() {
    let provider = ScriptedProvider::new(text(
        r#"{"summary": "chunk note", "anomalies": [{"i": 0, "reason": "disk", "severity": "high"}]}"#,
    ))
    .on("<anomalies>", Reply::Fail);
    let mut cfg = config(8, SHORT);
    cfg.synthesize_summary = true;
    let pipeline = pipeline(provider, LinesStore { count: 2, up: true }, cfg);

    let report = pipeline.analyze(&query(2)).await.unwrap_or_else(|_| unreachable!());

    assert_eq!(report.summary, "chunk note");
    assert!(
        report
            .stats
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::SummaryFallback { .. }))
    );
}
