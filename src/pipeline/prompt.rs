//! System prompts and user-message builders for the pipeline agents.
//!
//! Prompts can be overridden from a template directory; missing files fall
//! back to the compiled-in defaults.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use serde_json::json;

use super::chunker::Chunk;
use super::types::RawAnomaly;

/// System prompt for the per-chunk extractor.
pub const EXTRACTOR_SYSTEM_PROMPT: &str =
    "You are a precise log analysis expert. Use only the provided lines. Return valid JSON.";

/// System prompt for the optional summary call.
pub const SUMMARIZER_SYSTEM_PROMPT: &str = r"You are a log analysis expert writing for an on-call engineer.

You receive the anomalies another analyst flagged in a set of retrieved log lines, with their severities and reasons, plus that analyst's per-batch notes.

Write a summary of at most three sentences:
- Lead with the most severe problem and what it affects.
- Mention recurring patterns or bursts if the reasons show them.
- Do not invent events, hosts, or timestamps that are not in the input.

Return plain text only, no JSON and no markdown headings.";

/// Task description appended to every chunk.
const EXTRACTOR_TASKS: &str = r#"Tasks:
1) Brief summary of notable events/bursts.
2) anomalies: list items with fields: i, reason, severity (low|medium|high).
   "i" is the integer index of the line in the array above.
3) next_actions: concrete follow-ups, one per anomaly in the same order.

Return JSON only:
{"summary":"...", "anomalies":[{"i":0,"reason":"...","severity":"medium"}], "next_actions":["...","..."]}"#;

/// Default prompt directory under the user's home.
const DEFAULT_PROMPT_DIR: &str = ".config/logsift/prompts";

/// Filename for the extractor prompt template.
const EXTRACTOR_FILENAME: &str = "extractor.md";
/// Filename for the summarizer prompt template.
const SUMMARIZER_FILENAME: &str = "summarizer.md";

/// System prompts for all pipeline agents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    /// System prompt for the extractor.
    pub extractor: String,
    /// System prompt for the summarizer.
    pub summarizer: String,
}

impl PromptSet {
    /// Loads prompts from `prompt_dir`, or the default directory when unset.
    ///
    /// Each file is loaded independently; a missing file uses its default.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir.map(PathBuf::from).or_else(Self::default_dir);

        let load_file = |filename: &str, default: &str| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(filename))
                .and_then(|path| std::fs::read_to_string(path).ok())
                .filter(|content| !content.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            extractor: load_file(EXTRACTOR_FILENAME, EXTRACTOR_SYSTEM_PROMPT),
            summarizer: load_file(SUMMARIZER_FILENAME, SUMMARIZER_SYSTEM_PROMPT),
        }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            extractor: EXTRACTOR_SYSTEM_PROMPT.to_string(),
            summarizer: SUMMARIZER_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Writes the default prompts to `dir`, creating it if needed.
    ///
    /// Existing files are left untouched. Returns the paths written.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let templates = [
            (EXTRACTOR_FILENAME, EXTRACTOR_SYSTEM_PROMPT),
            (SUMMARIZER_FILENAME, SUMMARIZER_SYSTEM_PROMPT),
        ];

        let mut written = Vec::new();
        for (filename, content) in templates {
            let path = dir.join(filename);
            if !path.exists() {
                std::fs::write(&path, content)?;
                written.push(path);
            }
        }

        Ok(written)
    }

    /// Default prompt directory, `None` if the home directory is unknown.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }
}

/// Builds the user message for one chunk.
///
/// Lines are listed as a JSON array of `{i, text}` with chunk-local indices.
/// Records without a raw line fall back to their parsed message.
#[must_use]
pub fn build_extractor_prompt(chunk: &Chunk) -> String {
    let lines: Vec<serde_json::Value> = chunk
        .records()
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let text = if record.raw_text.is_empty() {
                &record.message
            } else {
                &record.raw_text
            };
            json!({"i": i, "text": text})
        })
        .collect();
    let lines = serde_json::to_string(&lines).unwrap_or_else(|_| "[]".to_string());

    format!(
        "Given these log lines (array of objects with text+meta):\n\n{lines}\n\n{EXTRACTOR_TASKS}"
    )
}

/// Builds the user message for the summary call.
#[must_use]
pub fn build_summarizer_prompt(
    query: &str,
    raw_anomalies: &[RawAnomaly],
    chunk_summaries: &[String],
) -> String {
    let mut prompt = format!("<query>{query}</query>\n\n<anomalies>\n");
    for anomaly in raw_anomalies {
        let _ = writeln!(
            prompt,
            "- [{}] line {}: {}",
            anomaly.severity,
            anomaly.claimed_global_index(),
            anomaly.reason
        );
    }
    prompt.push_str("</anomalies>\n\n<notes>\n");
    for summary in chunk_summaries.iter().filter(|s| !s.trim().is_empty()) {
        let _ = writeln!(prompt, "- {}", summary.trim());
    }
    prompt.push_str("</notes>\n\nSummarize these findings.");
    prompt
}
