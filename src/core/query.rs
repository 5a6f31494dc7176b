//! Validated query parameters.

use crate::error::PipelineError;

/// Maximum accepted query length in bytes.
pub const MAX_QUERY_LEN: usize = 10_000;

/// Bounds on `k` for one kind of request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    /// Largest accepted `k`.
    pub max_k: usize,
    /// Clamp `k > max_k` down to `max_k` instead of rejecting it.
    pub clamp_above: bool,
}

impl QueryLimits {
    /// Plain retrieval: `1..=100`, anything outside is rejected.
    pub const RETRIEVAL: Self = Self {
        max_k: 100,
        clamp_above: false,
    };

    /// Anomaly analysis: `k > 32` is clamped to 32, `k < 1` is rejected.
    pub const ANALYSIS: Self = Self {
        max_k: 32,
        clamp_above: true,
    };
}

/// An immutable, validated query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    k: usize,
}

impl Query {
    /// Validates `text` and `k` against `limits`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Validation`] for empty or oversized text,
    /// `k < 1`, or `k > max_k` when clamping is off.
    pub fn new(text: impl Into<String>, k: i64, limits: QueryLimits) -> Result<Self, PipelineError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(PipelineError::validation("query cannot be empty"));
        }
        if text.len() > MAX_QUERY_LEN {
            return Err(PipelineError::validation(format!(
                "query exceeds maximum length ({} bytes, max {MAX_QUERY_LEN})",
                text.len()
            )));
        }
        if k < 1 {
            return Err(PipelineError::validation(format!(
                "k must be between 1 and {}, got {k}",
                limits.max_k
            )));
        }

        let k = usize::try_from(k).unwrap_or(usize::MAX);
        let k = if k > limits.max_k {
            if !limits.clamp_above {
                return Err(PipelineError::validation(format!(
                    "k must be between 1 and {}, got {k}",
                    limits.max_k
                )));
            }
            limits.max_k
        } else {
            k
        };

        Ok(Self { text, k })
    }

    /// Query text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of candidates to retrieve.
    #[must_use]
    pub const fn k(&self) -> usize {
        self.k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0 ; "zero")]
    #[test_case(-3 ; "negative")]
    #[test_case(101 ; "above max")]
    fn test_retrieval_rejects(k: i64) {
        let result = Query::new("errors", k, QueryLimits::RETRIEVAL);
        assert!(matches!(result, Err(PipelineError::Validation { .. })));
    }

    #[test_case(1 ; "min")]
    #[test_case(8 ; "default")]
    #[test_case(100 ; "max")]
    fn test_retrieval_accepts(k: i64) {
        let query = Query::new("errors", k, QueryLimits::RETRIEVAL)
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(i64::try_from(query.k()).unwrap_or_default(), k);
    }

    #[test]
    fn test_analysis_clamps_above() {
        let query = Query::new("recent anomalies", 500, QueryLimits::ANALYSIS)
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(query.k(), 32);
    }

    #[test]
    fn test_analysis_rejects_zero() {
        let result = Query::new("recent anomalies", 0, QueryLimits::ANALYSIS);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_text_rejected() {
        assert!(Query::new("   ", 5, QueryLimits::RETRIEVAL).is_err());
    }

    #[test]
    fn test_oversized_text_rejected() {
        let text = "x".repeat(MAX_QUERY_LEN + 1);
        assert!(Query::new(text, 5, QueryLimits::RETRIEVAL).is_err());
    }
}
