//! Severity of a flagged anomaly.
//!
//! Lives in `core` so the extractor, confirmer and aggregator share the
//! same parsing and ordering rules.

use serde::{Deserialize, Serialize};

/// Severity of an anomaly, ordered from lowest to highest.
///
/// The derived [`Ord`] puts `High` last so that `max` picks the most
/// severe variant; deduplication in the aggregator relies on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Worth monitoring.
    Low,
    /// Should be investigated.
    Medium,
    /// Needs immediate attention.
    High,
}

impl Severity {
    /// Parses a severity string (case-insensitive, surrounding whitespace ignored).
    ///
    /// Returns `None` for anything other than `low`, `medium` or `high`;
    /// callers decide whether that drops the entry.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Deterministic follow-up used when the model supplied none.
    #[must_use]
    pub const fn fallback_action(self) -> &'static str {
        match self {
            Self::High => "Escalate immediately",
            Self::Medium => "Investigate within the next business day",
            Self::Low => "Monitor for recurrence",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
