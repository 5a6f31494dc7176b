//! Core data model shared by retrieval, the pipeline and the HTTP surface.

pub mod query;
pub mod record;
pub mod severity;

pub use query::{MAX_QUERY_LEN, Query, QueryLimits};
pub use record::{CandidateSet, LogLevel, LogRecord, ScoredHit};
pub use severity::Severity;
