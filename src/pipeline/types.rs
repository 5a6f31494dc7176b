//! Pipeline data types: raw and confirmed anomalies, diagnostics, the
//! per-request stage machine and the final report.

use std::time::Duration;

use crate::core::{LogRecord, Severity};

/// Pipeline stage for one request.
///
/// `Failed` is reachable from `Retrieving`, and from `Extracting` only when
/// every chunk call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Request accepted and validated.
    Received,
    /// Embedding and similarity search.
    Retrieving,
    /// Splitting candidates into chunks.
    Chunking,
    /// One LLM call per chunk.
    Extracting,
    /// Resolving local indices against retrieved records.
    Confirming,
    /// Dedup, summary and layman explanation.
    Aggregating,
    /// Report built.
    Done,
    /// Request failed.
    Failed,
}

impl Stage {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "RECEIVED",
            Self::Retrieving => "RETRIEVING",
            Self::Chunking => "CHUNKING",
            Self::Extracting => "EXTRACTING",
            Self::Confirming => "CONFIRMING",
            Self::Aggregating => "AGGREGATING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        }
    }

    /// Returns `true` for `Done` and `Failed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An anomaly as claimed by the model for one chunk, after the parse
/// boundary. The index is still unverified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAnomaly {
    /// Chunk-local index claimed by the model; may be out of range.
    pub local_index: i64,
    /// Global index of the chunk's first record.
    pub base_offset: usize,
    /// Model-supplied reason.
    pub reason: String,
    /// Model-supplied severity.
    pub severity: Severity,
    /// Model-supplied follow-up, if any.
    pub next_action: Option<String>,
}

impl RawAnomaly {
    /// `base_offset + local_index`, which may be negative or past the end.
    #[must_use]
    pub fn claimed_global_index(&self) -> i64 {
        i64::try_from(self.base_offset)
            .unwrap_or(i64::MAX)
            .saturating_add(self.local_index)
    }
}

/// A raw anomaly resolved to a record that exists in the candidate set.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedAnomaly {
    /// The resolved record, copied verbatim.
    pub record: LogRecord,
    /// Model-supplied reason.
    pub reason: String,
    /// Model-supplied severity.
    pub severity: Severity,
    /// Model-supplied follow-up or the severity fallback.
    pub next_action: String,
}

impl ConfirmedAnomaly {
    /// Global index of the resolved record.
    #[must_use]
    pub const fn global_index(&self) -> usize {
        self.record.global_index
    }
}

/// Something the pipeline absorbed instead of failing the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The chunk response contained no usable JSON object.
    ParseError {
        /// Chunk the response belonged to.
        chunk_index: usize,
        /// Parser detail.
        message: String,
    },
    /// One anomaly entry was malformed and dropped.
    InvalidEntry {
        /// Chunk the entry belonged to.
        chunk_index: usize,
        /// Position of the entry in the model's list.
        position: usize,
        /// What was wrong with it.
        message: String,
    },
    /// A parsed anomaly referenced a record outside its chunk.
    IndexOutOfRange {
        /// Chunk the anomaly belonged to.
        chunk_index: usize,
        /// Claimed chunk-local index.
        local_index: i64,
        /// Number of records in the chunk.
        chunk_len: usize,
    },
    /// The chunk call timed out.
    ChunkTimedOut {
        /// Chunk that timed out.
        chunk_index: usize,
    },
    /// The chunk call failed.
    ChunkFailed {
        /// Chunk that failed.
        chunk_index: usize,
        /// Error detail.
        message: String,
    },
    /// The summary call failed and the deterministic summary was used.
    SummaryFallback {
        /// Error detail.
        message: String,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseError {
                chunk_index,
                message,
            } => write!(f, "chunk {chunk_index}: unparseable response: {message}"),
            Self::InvalidEntry {
                chunk_index,
                position,
                message,
            } => write!(f, "chunk {chunk_index}: entry {position} dropped: {message}"),
            Self::IndexOutOfRange {
                chunk_index,
                local_index,
                chunk_len,
            } => write!(
                f,
                "chunk {chunk_index}: index {local_index} outside 0..{chunk_len}"
            ),
            Self::ChunkTimedOut { chunk_index } => write!(f, "chunk {chunk_index}: timed out"),
            Self::ChunkFailed {
                chunk_index,
                message,
            } => write!(f, "chunk {chunk_index}: {message}"),
            Self::SummaryFallback { message } => write!(f, "summary fallback: {message}"),
        }
    }
}

/// Execution statistics attached to a report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    /// Chunks sent to the model.
    pub chunks_total: usize,
    /// Chunks whose call failed or timed out.
    pub chunks_failed: usize,
    /// Everything absorbed along the way.
    pub diagnostics: Vec<Diagnostic>,
    /// Wall-clock time for the request.
    pub elapsed: Duration,
}

/// Final, partially verified anomaly report for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    /// Short synthesis of what was found.
    pub summary: String,
    /// Every parsed model claim, before dedup.
    pub raw_anomalies: Vec<RawAnomaly>,
    /// Deduplicated confirmed anomalies, ordered by global index.
    pub confirmed_anomalies: Vec<ConfirmedAnomaly>,
    /// Plain-language flagged vs verified counts.
    pub layman_explanation: String,
    /// Execution statistics.
    pub stats: RunStats,
}
