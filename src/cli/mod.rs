//! CLI layer for logsift.
//!
//! Provides the command-line interface using clap: serving the HTTP API,
//! running retrieval or analysis in-process, probing dependencies, and
//! installing prompt templates.

pub mod commands;
pub mod parser;

pub use commands::execute;
pub use parser::{Cli, Commands, ConfigOverrides, OutputFormat};
