//! CLI command implementations.
//!
//! Commands run the pipeline in-process; each returns the text to print.

use std::fmt::Write as FmtWrite;
use std::path::Path;

use serde::Serialize;

use crate::cli::parser::{Cli, Commands, OutputFormat};
use crate::config::AppConfig;
use crate::core::{Query, QueryLimits};
use crate::error::{CommandError, Result};
use crate::health::{HealthReport, HealthStatus};
use crate::pipeline::PromptSet;
use crate::server::view::{AnalysisView, HitView};
use crate::server::{self, AppState, DEFAULT_ANOMALY_QUERY};

/// Executes the CLI command.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the command fails.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = cli.format;
    let config = || -> Result<AppConfig> {
        cli.overrides
            .resolve()
            .map_err(|e| CommandError::InvalidArgument(format!("configuration: {e}")).into())
    };

    match &cli.command {
        Commands::Serve { bind } => {
            let mut config = config()?;
            if let Some(addr) = bind {
                config.bind.clone_from(addr);
            }
            cmd_serve(config)
        }
        Commands::Query { query, k } => cmd_query(config()?, query, *k, format),
        Commands::Anomalies { query, k } => {
            cmd_anomalies(config()?, query.as_deref(), *k, format)
        }
        Commands::Health => cmd_health(config()?, format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

fn build_state(config: AppConfig) -> Result<AppState> {
    AppState::from_config(config)
        .map_err(|e| CommandError::ExecutionFailed(format!("Failed to initialize: {e}")).into())
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map(|mut s| {
            s.push('\n');
            s
        })
        .map_err(|e| CommandError::OutputFormat(format!("JSON serialization failed: {e}")).into())
}

fn cmd_serve(config: AppConfig) -> Result<String> {
    let rt = runtime()?;
    rt.block_on(server::serve(config))
        .map_err(|e| CommandError::ExecutionFailed(format!("Server error: {e}")))?;
    Ok(String::new())
}

fn cmd_query(config: AppConfig, text: &str, k: Option<i64>, format: OutputFormat) -> Result<String> {
    let default_k = i64::try_from(config.top_k_default).unwrap_or(i64::MAX);
    let query = Query::new(text, k.unwrap_or(default_k), QueryLimits::RETRIEVAL)
        .map_err(|e| CommandError::InvalidArgument(e.to_string()))?;
    let state = build_state(config)?;

    let rt = runtime()?;
    let candidates = rt
        .block_on(state.pipeline.retrieve(&query))
        .map_err(|e| CommandError::ExecutionFailed(format!("Query failed: {e}")))?;
    let hits: Vec<HitView> = candidates.iter().map(HitView::from).collect();

    match format {
        OutputFormat::Json => to_json(&hits),
        OutputFormat::Text => Ok(render_hits(&hits)),
    }
}

fn cmd_anomalies(
    config: AppConfig,
    text: Option<&str>,
    k: Option<i64>,
    format: OutputFormat,
) -> Result<String> {
    let default_k = i64::try_from(QueryLimits::ANALYSIS.max_k).unwrap_or(i64::MAX);
    let query = Query::new(
        text.unwrap_or(DEFAULT_ANOMALY_QUERY),
        k.unwrap_or(default_k),
        QueryLimits::ANALYSIS,
    )
    .map_err(|e| CommandError::InvalidArgument(e.to_string()))?;
    let state = build_state(config)?;

    let rt = runtime()?;
    let result = rt
        .block_on(state.pipeline.analyze(&query))
        .map_err(|e| CommandError::ExecutionFailed(format!("Analysis failed: {e}")))?;
    let view = AnalysisView::from(&result);

    match format {
        OutputFormat::Json => to_json(&view),
        OutputFormat::Text => Ok(render_analysis(&view)),
    }
}

fn cmd_health(config: AppConfig, format: OutputFormat) -> Result<String> {
    let state = build_state(config)?;
    let rt = runtime()?;
    let report = rt.block_on(state.health.check());

    match format {
        OutputFormat::Json => to_json(&report),
        OutputFormat::Text => Ok(render_health(&report)),
    }
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(Path::to_path_buf)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("unknown");
                let _ = writeln!(output, "  {name}");
            }
            output.push_str("\nEdit these files to customize the extractor and summarizer prompts.\n");
            Ok(output)
        }
        OutputFormat::Json => to_json(&serde_json::json!({
            "directory": target_dir.to_string_lossy(),
            "written": written
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect::<Vec<_>>(),
            "count": written.len(),
        })),
    }
}

fn render_hits(hits: &[HitView]) -> String {
    if hits.is_empty() {
        return "No matching log lines.\n".to_string();
    }
    let mut out = String::new();
    for (i, hit) in hits.iter().enumerate() {
        let _ = writeln!(out, "{i:>3}  {:.3}  {}", hit.score, hit.text);
    }
    out
}

fn render_analysis(view: &AnalysisView) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "== Summary ==\n{}\n", view.summary);

    let _ = writeln!(out, "== Confirmed anomalies ({}) ==", view.confirmed_anomalies.len());
    if view.confirmed_anomalies.is_empty() {
        out.push_str("(none)\n");
    }
    for a in &view.confirmed_anomalies {
        let _ = writeln!(
            out,
            "[{}] line {} | {} | {}\n    {}\n    reason: {}\n    next: {}",
            a.severity, a.i, a.timestamp, a.thread, a.text, a.reason, a.next_action
        );
    }

    let _ = writeln!(out, "\n== Raw model claims ({}) ==", view.raw_anomalies.len());
    if view.raw_anomalies.is_empty() {
        out.push_str("(none)\n");
    }
    for r in &view.raw_anomalies {
        let _ = writeln!(out, "[{}] line {}: {}", r.severity, r.i, r.reason);
    }

    let _ = writeln!(out, "\n== In plain terms ==\n{}", view.layman_explanation);

    let _ = writeln!(
        out,
        "\n---\nChunks: {} ({} failed) | Dropped: {} | Time: {:.1}s",
        view.chunks_total, view.chunks_failed, view.diagnostics, view.elapsed
    );
    out
}

fn render_health(report: &HealthReport) -> String {
    let mark = |up: bool| if up { "up" } else { "down" };
    let status = match report.status {
        HealthStatus::Healthy => "healthy",
        HealthStatus::Degraded => "degraded",
    };
    format!(
        "elasticsearch: {}\nollama:        {}\nstatus:        {status}\n",
        mark(report.elasticsearch),
        mark(report.ollama)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LogLevel, Severity};
    use crate::server::view::{ConfirmedAnomalyView, RawAnomalyView};
    use tempfile::TempDir;

    fn view() -> AnalysisView {
        AnalysisView {
            summary: "Disk pressure on io thread.".to_string(),
            raw_anomalies: vec![
                RawAnomalyView {
                    i: 1,
                    reason: "disk full".to_string(),
                    severity: Severity::High,
                },
                RawAnomalyView {
                    i: 9,
                    reason: "made up".to_string(),
                    severity: Severity::Low,
                },
            ],
            confirmed_anomalies: vec![ConfirmedAnomalyView {
                i: 1,
                timestamp: "t1".to_string(),
                timestamp_when: "t1".to_string(),
                thread: "io".to_string(),
                thread_where: "io".to_string(),
                text: "t1 [io] ERROR disk full".to_string(),
                text_message: "t1 [io] ERROR disk full".to_string(),
                level: LogLevel::Error,
                score: 1.9,
                reason: "disk full".to_string(),
                severity: Severity::High,
                next_action: "Escalate immediately".to_string(),
            }],
            layman_explanation: "The model flagged 2 issue(s); 1 were verified in your logs."
                .to_string(),
            chunks_total: 1,
            chunks_failed: 0,
            diagnostics: 1,
            elapsed: 0.5,
        }
    }

    #[test]
    fn test_render_analysis_sections() {
        let out = render_analysis(&view());
        assert!(out.contains("== Summary =="));
        assert!(out.contains("== Confirmed anomalies (1) =="));
        assert!(out.contains("== Raw model claims (2) =="));
        assert!(out.contains("== In plain terms =="));
        assert!(out.contains("[high] line 1"));
        assert!(out.contains("line 9: made up"));
    }

    #[test]
    fn test_render_health() {
        let out = render_health(&HealthReport {
            elasticsearch: true,
            ollama: false,
            status: HealthStatus::Degraded,
        });
        assert!(out.contains("elasticsearch: up"));
        assert!(out.contains("ollama:        down"));
        assert!(out.contains("degraded"));
    }

    #[test]
    fn test_render_empty_hits() {
        assert_eq!(render_hits(&[]), "No matching log lines.\n");
    }

    #[test]
    fn test_init_prompts_writes_then_skips() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let first = cmd_init_prompts(Some(dir.path()), OutputFormat::Text)
            .unwrap_or_else(|_| unreachable!());
        assert!(first.contains("Wrote 2 prompt template(s)"));
        let second = cmd_init_prompts(Some(dir.path()), OutputFormat::Json)
            .unwrap_or_else(|_| unreachable!());
        let json: serde_json::Value =
            serde_json::from_str(&second).unwrap_or_else(|_| unreachable!());
        assert_eq!(json["count"], 0);
    }

    #[test]
    fn test_query_validation_before_backends() {
        let cli = Cli {
            verbose: false,
            format: OutputFormat::Text,
            overrides: crate::cli::parser::ConfigOverrides::default(),
            command: Commands::Query {
                query: "disk".to_string(),
                k: Some(0),
            },
        };
        let err = execute(&cli).err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("k must be between 1 and 100"), "{err}");
    }
}
