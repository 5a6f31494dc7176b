//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::{AppConfig, AppConfigBuilder};
use crate::error::ConfigError;

/// logsift: semantic log retrieval with verified LLM anomaly extraction.
///
/// Retrieves the log lines closest to a question, asks a model to flag
/// anomalies among them, and keeps only the claims that point at a line
/// the model was actually shown.
#[derive(Parser, Debug)]
#[command(name = "logsift")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Configuration overrides.
    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// How command results are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable sections.
    Text,
    /// Pretty-printed JSON, same shape as the HTTP API.
    Json,
}

/// Settings that take precedence over environment variables.
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Elasticsearch base URL.
    #[arg(long, global = true)]
    pub es_host: Option<String>,

    /// Index holding embedded log lines.
    #[arg(long, global = true)]
    pub es_index: Option<String>,

    /// LLM provider (ollama, openai).
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Ollama base URL.
    #[arg(long, global = true)]
    pub ollama_url: Option<String>,

    /// Generation model.
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Records per LLM call.
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    /// Maximum concurrent LLM calls per request.
    #[arg(long, global = true)]
    pub max_concurrency: Option<usize>,

    /// Per-call LLM deadline in seconds.
    #[arg(long, global = true)]
    pub llm_timeout_secs: Option<u64>,

    /// Ask the model for one final summary over all anomalies.
    #[arg(long, global = true)]
    pub synthesize: bool,

    /// Directory containing prompt template files.
    #[arg(long, global = true)]
    pub prompt_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Applies the overrides on top of environment resolution.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the resolved configuration is invalid.
    pub fn resolve(&self) -> Result<AppConfig, ConfigError> {
        self.apply(AppConfig::builder()).from_env().build()
    }

    fn apply(&self, mut builder: AppConfigBuilder) -> AppConfigBuilder {
        if let Some(host) = &self.es_host {
            builder = builder.es_host(host);
        }
        if let Some(index) = &self.es_index {
            builder = builder.es_index(index);
        }
        if let Some(provider) = &self.provider {
            builder = builder.llm_provider(provider);
        }
        if let Some(url) = &self.ollama_url {
            builder = builder.ollama_url(url);
        }
        if let Some(model) = &self.model {
            builder = builder.model(model);
        }
        if let Some(n) = self.chunk_size {
            builder = builder.chunk_size(n);
        }
        if let Some(n) = self.max_concurrency {
            builder = builder.max_concurrency(n);
        }
        if let Some(secs) = self.llm_timeout_secs {
            builder = builder.llm_timeout(Duration::from_secs(secs));
        }
        if self.synthesize {
            builder = builder.synthesize_summary(true);
        }
        if let Some(dir) = &self.prompt_dir {
            builder = builder.prompt_dir(dir);
        }
        builder
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP API.
    #[command(after_help = r#"Examples:
  logsift serve                       # Listen on LOGSIFT_BIND or 0.0.0.0:8000
  logsift serve --bind 127.0.0.1:9000
"#)]
    Serve {
        /// Address to listen on.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Retrieve the log lines most similar to a query.
    #[command(after_help = r#"Examples:
  logsift query "connection refused"
  logsift query "disk errors" -k 20
  logsift --format json query "timeout" | jq '.[].text'
"#)]
    Query {
        /// Query text.
        query: String,

        /// Number of lines to retrieve (1-100). Defaults to TOP_K.
        #[arg(short = 'k', long, allow_negative_numbers = true)]
        k: Option<i64>,
    },

    /// Retrieve lines and report verified anomalies among them.
    #[command(after_help = r#"Examples:
  logsift anomalies                           # "recent anomalies", k=32
  logsift anomalies "payment failures" -k 16
  logsift --synthesize anomalies "auth errors"
"#)]
    Anomalies {
        /// Question to analyze.
        query: Option<String>,

        /// Number of lines to analyze (values above 32 are clamped).
        #[arg(short = 'k', long, allow_negative_numbers = true)]
        k: Option<i64>,
    },

    /// Check whether Elasticsearch and the LLM service answer.
    Health,

    /// Write the default prompt templates to a directory.
    ///
    /// Existing files are left untouched.
    #[command(name = "init-prompts")]
    InitPrompts {
        /// Target directory. Defaults to ~/.config/logsift/prompts.
        dir: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn test_parse_anomalies_defaults() {
        let cli = parse(&["logsift", "anomalies"]);
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(matches!(
            cli.command,
            Commands::Anomalies { query: None, k: None }
        ));
    }

    #[test]
    fn test_parse_query_with_k_and_format() {
        let cli = parse(&["logsift", "--format", "json", "query", "disk", "-k", "20"]);
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Query { query, k } => {
                assert_eq!(query, "disk");
                assert_eq!(k, Some(20));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_negative_k_reaches_validation() {
        let cli = parse(&["logsift", "query", "disk", "-k", "-1"]);
        assert!(matches!(cli.command, Commands::Query { k: Some(-1), .. }));
    }

    #[test]
    fn test_global_overrides_after_subcommand() {
        let cli = parse(&["logsift", "health", "--model", "llama3", "--chunk-size", "4"]);
        assert_eq!(cli.overrides.model.as_deref(), Some("llama3"));
        assert_eq!(cli.overrides.chunk_size, Some(4));
    }

    #[test]
    fn test_overrides_win_over_defaults() {
        let overrides = ConfigOverrides {
            model: Some("llama3".to_string()),
            chunk_size: Some(3),
            ..ConfigOverrides::default()
        };
        let config = overrides
            .apply(AppConfig::builder())
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.model, "llama3");
        assert_eq!(config.chunk_size, 3);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let overrides = ConfigOverrides {
            chunk_size: Some(0),
            ..ConfigOverrides::default()
        };
        assert!(overrides.apply(AppConfig::builder()).build().is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
