//! Resolves raw anomalies against the records of their chunk.
//!
//! Pure: a claim either names a record that was actually retrieved or it is
//! dropped with a diagnostic. Nothing is guessed.

use super::chunker::Chunk;
use super::types::{ConfirmedAnomaly, Diagnostic, RawAnomaly};

/// Confirms every raw anomaly of `chunk`.
///
/// Output keeps the input order; dropped claims appear as
/// [`Diagnostic::IndexOutOfRange`].
#[must_use]
pub fn confirm(chunk: &Chunk, raw: &[RawAnomaly]) -> (Vec<ConfirmedAnomaly>, Vec<Diagnostic>) {
    let mut confirmed = Vec::with_capacity(raw.len());
    let mut diagnostics = Vec::new();

    for anomaly in raw {
        let resolved = chunk.get(anomaly.local_index).filter(|record| {
            i64::try_from(record.global_index).ok() == Some(anomaly.claimed_global_index())
        });

        match resolved {
            Some(record) => confirmed.push(ConfirmedAnomaly {
                record: record.clone(),
                reason: anomaly.reason.clone(),
                severity: anomaly.severity,
                next_action: anomaly
                    .next_action
                    .clone()
                    .unwrap_or_else(|| anomaly.severity.fallback_action().to_string()),
            }),
            None => diagnostics.push(Diagnostic::IndexOutOfRange {
                chunk_index: chunk.chunk_index(),
                local_index: anomaly.local_index,
                chunk_len: chunk.len(),
            }),
        }
    }

    (confirmed, diagnostics)
}
