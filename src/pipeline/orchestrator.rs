//! Request-level anomaly pipeline.
//!
//! Coordinates retrieval → chunking → concurrent extraction → confirmation
//! → aggregation for one query. Chunk calls fan out as tasks on a
//! [`JoinSet`] bounded by a semaphore; dropping the returned future or
//! cancelling the token aborts every in-flight call.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::aggregator::{SummarySource, aggregate};
use super::chunker::{Chunk, split};
use super::confirmer::confirm;
use super::extractor::{ChunkExtraction, ExtractorAgent};
use super::prompt::{PromptSet, build_summarizer_prompt};
use super::summarizer::SummarizerAgent;
use super::types::{AnalysisResult, Diagnostic, RawAnomaly, RunStats, Stage};
use crate::config::AppConfig;
use crate::core::{CandidateSet, Query};
use crate::error::{AgentError, PipelineError};
use crate::llm::{Agent, LlmProvider};
use crate::retrieval::Retriever;

/// How one chunk call ended.
#[derive(Debug)]
enum ChunkOutcome {
    Done(ChunkExtraction),
    TimedOut,
    Failed(String),
}

/// The anomaly-detection pipeline.
///
/// Holds only shared, read-only collaborators; every call to
/// [`analyze`](Self::analyze) owns its own candidate set and results.
pub struct AnomalyPipeline {
    provider: Arc<dyn LlmProvider>,
    retriever: Arc<Retriever>,
    config: AppConfig,
    prompts: PromptSet,
}

impl AnomalyPipeline {
    /// Creates a pipeline, loading prompts from the configured directory.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, retriever: Arc<Retriever>, config: AppConfig) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self {
            provider,
            retriever,
            config,
            prompts,
        }
    }

    /// Replaces the prompt set.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    /// The LLM provider, for health probing.
    #[must_use]
    pub fn provider(&self) -> Arc<dyn LlmProvider> {
        Arc::clone(&self.provider)
    }

    /// The retriever.
    #[must_use]
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Plain retrieval without analysis.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Validation`] for out-of-range `k` and
    /// [`PipelineError::UpstreamUnavailable`] when retrieval fails.
    pub async fn retrieve(&self, query: &Query) -> Result<CandidateSet, PipelineError> {
        let started = Instant::now();
        let candidates = self.retriever.retrieve(query).await.map_err(|e| {
            let err = PipelineError::from(e);
            error!(error = %err, "retrieval failed");
            err
        })?;
        info!(
            query = query.text(),
            k = query.k(),
            hits = candidates.len(),
            elapsed_secs = started.elapsed().as_secs_f64(),
            "/query processed"
        );
        Ok(candidates)
    }

    /// Runs the full pipeline for `query`.
    ///
    /// # Errors
    ///
    /// See [`analyze_until`](Self::analyze_until).
    pub async fn analyze(&self, query: &Query) -> Result<AnalysisResult, PipelineError> {
        self.analyze_until(query, &CancellationToken::new()).await
    }

    /// Runs the full pipeline, aborting when `cancel` fires.
    ///
    /// Chunk failures are absorbed as long as at least one chunk succeeds.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::UpstreamUnavailable`] when retrieval fails, or every
    ///   chunk call fails and at least one did not time out
    /// - [`PipelineError::UpstreamTimeout`] when every chunk call timed out
    /// - [`PipelineError::Cancelled`] when `cancel` fires first
    pub async fn analyze_until(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, PipelineError> {
        let started = Instant::now();
        enter(Stage::Received);

        enter(Stage::Retrieving);
        let candidates = tokio::select! {
            () = cancel.cancelled() => return Err(PipelineError::Cancelled),
            result = self.retriever.retrieve(query) => {
                result.map_err(|e| fail(Stage::Retrieving, PipelineError::from(e)))?
            }
        };

        enter(Stage::Chunking);
        let chunks = split(&candidates, self.config.chunk_size)
            .map_err(|e| fail(Stage::Chunking, e))?;

        enter(Stage::Extracting);
        let outcomes = self.fan_out(&chunks, cancel).await?;
        let mut stats = RunStats {
            chunks_total: chunks.len(),
            ..RunStats::default()
        };
        let mut timed_out = 0usize;
        for (index, outcome) in outcomes.iter().enumerate() {
            match outcome {
                ChunkOutcome::Done(_) => {}
                ChunkOutcome::TimedOut => {
                    timed_out += 1;
                    stats
                        .diagnostics
                        .push(Diagnostic::ChunkTimedOut { chunk_index: index });
                }
                ChunkOutcome::Failed(message) => stats.diagnostics.push(Diagnostic::ChunkFailed {
                    chunk_index: index,
                    message: message.clone(),
                }),
            }
        }
        stats.chunks_failed = outcomes
            .iter()
            .filter(|o| !matches!(o, ChunkOutcome::Done(_)))
            .count();

        if !chunks.is_empty() && stats.chunks_failed == chunks.len() {
            let err = if timed_out == chunks.len() {
                PipelineError::UpstreamTimeout {
                    message: format!("all {} chunk calls timed out", chunks.len()),
                }
            } else {
                PipelineError::UpstreamUnavailable {
                    message: format!("all {} chunk calls failed", chunks.len()),
                }
            };
            return Err(fail(Stage::Extracting, err));
        }

        enter(Stage::Confirming);
        let mut raw: Vec<RawAnomaly> = Vec::new();
        let mut confirmed = Vec::new();
        let mut chunk_summaries = Vec::new();
        let mut tokens: u32 = 0;
        for (chunk, outcome) in chunks.iter().zip(outcomes) {
            let ChunkOutcome::Done(extraction) = outcome else {
                continue;
            };
            let (accepted, dropped) = confirm(chunk, &extraction.anomalies);
            for diag in &dropped {
                debug!(diagnostic = %diag, "anomaly not confirmed");
            }
            confirmed.extend(accepted);
            tokens = tokens.saturating_add(extraction.usage.total());
            stats.diagnostics.extend(extraction.diagnostics);
            stats.diagnostics.extend(dropped);
            raw.extend(extraction.anomalies);
            chunk_summaries.extend(extraction.summary);
        }

        enter(Stage::Aggregating);
        let synthesized = if self.config.synthesize_summary && !raw.is_empty() {
            tokio::select! {
                () = cancel.cancelled() => return Err(PipelineError::Cancelled),
                result = self.synthesize(query, &raw, &chunk_summaries) => match result {
                    Ok(summary) => Some(summary),
                    Err(e) => {
                        warn!(error = %e, "summary call failed, using chunk summaries");
                        stats.diagnostics.push(Diagnostic::SummaryFallback {
                            message: e.to_string(),
                        });
                        None
                    }
                }
            }
        } else {
            None
        };

        stats.elapsed = started.elapsed();
        let report = aggregate(
            &candidates,
            raw,
            confirmed,
            SummarySource {
                synthesized,
                chunk_summaries,
            },
            stats,
        );

        enter(Stage::Done);
        info!(
            query = query.text(),
            k = query.k(),
            hits = candidates.len(),
            raw = report.raw_anomalies.len(),
            confirmed = report.confirmed_anomalies.len(),
            chunks_failed = report.stats.chunks_failed,
            tokens,
            elapsed_secs = report.stats.elapsed.as_secs_f64(),
            "/anomalies processed"
        );
        Ok(report)
    }

    /// Runs one extractor call per chunk with bounded parallelism.
    ///
    /// Outcomes are returned in chunk order regardless of completion order.
    async fn fan_out(
        &self,
        chunks: &[Chunk],
        cancel: &CancellationToken,
    ) -> Result<Vec<ChunkOutcome>, PipelineError> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let extractor = Arc::new(ExtractorAgent::new(
            &self.config,
            self.prompts.extractor.clone(),
        ));

        let mut tasks = JoinSet::new();
        for chunk in chunks {
            let sem = Arc::clone(&semaphore);
            let provider = Arc::clone(&self.provider);
            let extractor = Arc::clone(&extractor);
            let chunk = chunk.clone();

            tasks.spawn(async move {
                let index = chunk.chunk_index();
                let Ok(_permit) = sem.acquire_owned().await else {
                    return (index, Err(AgentError::ApiRequest {
                        message: "extraction semaphore closed".to_string(),
                        status: None,
                    }));
                };
                let started = Instant::now();
                let result = extractor.extract(provider.as_ref(), &chunk).await;
                debug!(
                    chunk = index,
                    records = chunk.len(),
                    ok = result.is_ok(),
                    elapsed_ms = started.elapsed().as_millis(),
                    "chunk call finished"
                );
                (index, result)
            });
        }

        let mut outcomes: Vec<Option<ChunkOutcome>> = (0..chunks.len()).map(|_| None).collect();
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tasks.abort_all();
                    warn!(pending = tasks.len(), "analysis cancelled");
                    return Err(PipelineError::Cancelled);
                }
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((index, result))) => {
                        if let Some(slot) = outcomes.get_mut(index) {
                            *slot = Some(classify(index, result));
                        }
                    }
                    Some(Err(e)) => warn!(error = %e, "chunk task did not complete"),
                },
            }
        }

        Ok(outcomes
            .into_iter()
            .map(|o| o.unwrap_or_else(|| ChunkOutcome::Failed("chunk task aborted".to_string())))
            .collect())
    }

    async fn synthesize(
        &self,
        query: &Query,
        raw: &[RawAnomaly],
        chunk_summaries: &[String],
    ) -> Result<String, AgentError> {
        let agent = SummarizerAgent::new(&self.config, self.prompts.summarizer.clone());
        let user_msg = build_summarizer_prompt(query.text(), raw, chunk_summaries);
        let response = tokio::time::timeout(
            self.config.llm_timeout,
            agent.run(self.provider.as_ref(), &user_msg),
        )
        .await
        .map_err(|_| AgentError::timeout(self.config.llm_timeout))??;
        Ok(response.text)
    }
}

impl std::fmt::Debug for AnomalyPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnomalyPipeline")
            .field("provider", &self.provider.name())
            .field("retriever", &self.retriever)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn classify(index: usize, result: Result<ChunkExtraction, AgentError>) -> ChunkOutcome {
    match result {
        Ok(extraction) => ChunkOutcome::Done(extraction),
        Err(AgentError::Timeout { seconds }) => {
            warn!(chunk = index, seconds, "chunk call timed out");
            ChunkOutcome::TimedOut
        }
        Err(e) => {
            warn!(chunk = index, error = %e, "chunk call failed");
            ChunkOutcome::Failed(e.to_string())
        }
    }
}

fn enter(stage: Stage) {
    debug!(stage = %stage, "pipeline stage");
}

fn fail(stage: Stage, err: PipelineError) -> PipelineError {
    error!(stage = %stage, next = %Stage::Failed, error = %err, "pipeline failed");
    err
}
