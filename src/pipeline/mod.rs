//! Anomaly-detection pipeline.
//!
//! Candidates from the retriever are split into chunks, each chunk goes to
//! the model once, the model's claims are resolved against the records it
//! was shown, and the survivors are folded into an [`AnalysisResult`].

pub mod aggregator;
pub mod chunker;
pub mod confirmer;
pub mod extractor;
pub mod orchestrator;
pub mod prompt;
pub mod summarizer;
pub mod types;

pub use aggregator::{SummarySource, aggregate, dedup, layman_explanation};
pub use chunker::{Chunk, split};
pub use confirmer::confirm;
pub use extractor::{ChunkExtraction, ExtractorAgent, parse_response};
pub use orchestrator::AnomalyPipeline;
pub use prompt::PromptSet;
pub use summarizer::SummarizerAgent;
pub use types::{AnalysisResult, ConfirmedAnomaly, Diagnostic, RawAnomaly, RunStats, Stage};
