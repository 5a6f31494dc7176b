//! Retrieved log records and the ordered candidate set.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// Log level of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Error.
    Error,
    /// Warning.
    Warn,
    /// Informational.
    Info,
    /// Debug.
    Debug,
    /// Missing or unrecognised level.
    #[default]
    Unknown,
}

impl LogLevel {
    /// Parses a level string as stored in the index (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "ERROR" | "ERR" | "FATAL" | "SEVERE" => Self::Error,
            "WARN" | "WARNING" => Self::Warn,
            "INFO" => Self::Info,
            "DEBUG" | "TRACE" => Self::Debug,
            _ => Self::Unknown,
        }
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw similarity hit as returned by the vector store, before ranking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoredHit {
    /// Similarity score (higher is more similar).
    pub score: f64,
    /// Timestamp field, if indexed.
    pub timestamp: Option<String>,
    /// Level field, if indexed.
    pub level: Option<String>,
    /// Thread field, if indexed.
    pub thread: Option<String>,
    /// Parsed message field, if indexed.
    pub message: Option<String>,
    /// Full raw log line.
    pub text: Option<String>,
}

/// A retrieved log record with its stable position in the candidate set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// 0-based position in the candidate set; never renumbered.
    pub global_index: usize,
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
    /// Full raw log line.
    pub raw_text: String,
}

/// Ordered retrieval result for one query.
///
/// Records are sorted by descending score; equal scores keep the order the
/// store returned them in. `records[i].global_index == i` always holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSet {
    records: Vec<LogRecord>,
}

impl CandidateSet {
    /// Ranks `hits`, keeps at most `k`, and assigns global indices.
    ///
    /// NaN scores rank last.
    #[must_use]
    pub fn from_hits(hits: Vec<ScoredHit>, k: usize) -> Self {
        let mut hits: Vec<ScoredHit> = hits
            .into_iter()
            .map(|mut h| {
                if h.score.is_nan() {
                    h.score = f64::NEG_INFINITY;
                }
                h
            })
            .collect();

        // Stable sort: ties stay in arrival order, which becomes ascending global index.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);

        let records = hits
            .into_iter()
            .enumerate()
            .map(|(global_index, hit)| LogRecord {
                global_index,
                score: hit.score,
                timestamp: hit.timestamp.unwrap_or_default(),
                level: hit.level.as_deref().map_or(LogLevel::Unknown, LogLevel::parse),
                thread: hit.thread.unwrap_or_default(),
                message: hit.message.unwrap_or_default(),
                raw_text: hit.text.unwrap_or_default(),
            })
            .collect();

        Self { records }
    }

    /// Returns the records in rank order.
    #[must_use]
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Looks up a record by global index.
    #[must_use]
    pub fn get(&self, global_index: usize) -> Option<&LogRecord> {
        self.records.get(global_index)
    }
}

impl Deref for CandidateSet {
    type Target = [LogRecord];

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}
