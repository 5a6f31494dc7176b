//! Optional summary call over all raw anomalies.

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::llm::Agent;

/// Response budget for the summary.
const SUMMARIZER_MAX_TOKENS: u32 = 512;

/// Agent that condenses the flagged anomalies into a short summary.
pub struct SummarizerAgent {
    model: String,
    system_prompt: String,
}

impl SummarizerAgent {
    /// Creates a summarizer with the configured model and system prompt.
    #[must_use]
    pub fn new(config: &AppConfig, system_prompt: String) -> Self {
        Self {
            model: config.model.clone(),
            system_prompt,
        }
    }
}

#[async_trait]
impl Agent for SummarizerAgent {
    fn name(&self) -> &'static str {
        "summarizer"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        0.1
    }

    fn max_tokens(&self) -> u32 {
        SUMMARIZER_MAX_TOKENS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::prompt::SUMMARIZER_SYSTEM_PROMPT;

    #[test]
    fn test_agent_properties() {
        let config = AppConfig::builder()
            .model("llama3")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let agent = SummarizerAgent::new(&config, SUMMARIZER_SYSTEM_PROMPT.to_string());
        assert_eq!(agent.name(), "summarizer");
        assert_eq!(agent.model(), "llama3");
        assert_eq!(agent.reply_format(), crate::llm::ReplyFormat::Text);
        assert!((agent.temperature() - 0.1).abs() < f32::EPSILON);
        assert_eq!(agent.max_tokens(), SUMMARIZER_MAX_TOKENS);
    }
}
