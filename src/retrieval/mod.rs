//! Semantic retrieval of candidate log records.
//!
//! The query is embedded into the index's vector space and sent to the
//! vector store as a top-k similarity search; hits are ranked into a
//! [`CandidateSet`](crate::core::CandidateSet) with stable global indices.

pub mod cache;
pub mod embedding;
pub mod retriever;
pub mod vector_store;

pub use cache::RetrievalCache;
#[cfg(feature = "fastembed-embeddings")]
pub use embedding::FastEmbedder;
pub use embedding::{Embedder, OllamaEmbedder, create_embedder};
pub use retriever::Retriever;
pub use vector_store::{ElasticsearchStore, VectorStore};
