//! Error types for scribe-docs.

use std::path::PathBuf;
use std::time::Duration;

use crate::vector_store::VectorStoreError;

/// Errors raised by the load, chunk, index and retrieve stages.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// The documents root is missing, not a directory, or unreadable.
    #[error("failed to read documents root {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid chunking or retrieval parameters.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Embedding computation failed while building a vector index.
    #[error("indexing failed: {0}")]
    Index(String),

    #[error("embedding failed: {0}")]
    Embedding(#[from] scribe_llm::LlmError),

    #[error("embedding request timed out after {0:?}")]
    EmbedTimeout(Duration),

    /// Retrieval was attempted before a non-empty index was installed.
    #[error("document index is not initialized")]
    NotInitialized,

    #[error("k must be a positive integer")]
    InvalidLimit,

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),
}

/// Result type alias using `RetrievalError`.
pub type Result<T> = std::result::Result<T, RetrievalError>;
