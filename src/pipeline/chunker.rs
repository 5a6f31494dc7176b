//! Splits a candidate set into bounded, order-preserving chunks.
//!
//! Every chunk is a window into one shared arena of records, identified by
//! its `base_offset`; no chunk keeps a reverse map to the candidate set.

use std::sync::Arc;

use crate::core::{CandidateSet, LogRecord};
use crate::error::PipelineError;

/// A consecutive slice of the candidate set sized for one LLM call.
#[derive(Debug, Clone)]
pub struct Chunk {
    chunk_index: usize,
    base_offset: usize,
    len: usize,
    arena: Arc<[LogRecord]>,
}

impl Chunk {
    /// Position of this chunk in the chunk list.
    #[must_use]
    pub const fn chunk_index(&self) -> usize {
        self.chunk_index
    }

    /// Global index of the first record.
    #[must_use]
    pub const fn base_offset(&self) -> usize {
        self.base_offset
    }

    /// Number of records.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Always `false`; empty chunks are never produced.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Records in global order.
    #[must_use]
    pub fn records(&self) -> &[LogRecord] {
        self.arena
            .get(self.base_offset..self.base_offset + self.len)
            .unwrap_or(&[])
    }

    /// Looks up a record by chunk-local index.
    ///
    /// Negative or past-the-end indices resolve to `None`.
    #[must_use]
    pub fn get(&self, local_index: i64) -> Option<&LogRecord> {
        usize::try_from(local_index)
            .ok()
            .and_then(|i| self.records().get(i))
    }
}

/// Partitions `candidates` into chunks of at most `chunk_size` records.
///
/// An empty candidate set yields no chunks.
///
/// # Errors
///
/// Returns [`PipelineError::Validation`] if `chunk_size` is zero.
pub fn split(candidates: &CandidateSet, chunk_size: usize) -> Result<Vec<Chunk>, PipelineError> {
    if chunk_size < 1 {
        return Err(PipelineError::validation("chunk_size must be at least 1"));
    }

    let arena: Arc<[LogRecord]> = Arc::from(candidates.records());
    let total = arena.len();

    Ok((0..total)
        .step_by(chunk_size)
        .enumerate()
        .map(|(chunk_index, base_offset)| Chunk {
            chunk_index,
            base_offset,
            len: chunk_size.min(total - base_offset),
            arena: Arc::clone(&arena),
        })
        .collect())
}
