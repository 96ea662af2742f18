//! Document retrieval: load a directory of documents, split them into
//! overlapping chunks, index the chunks by keyword or by embedding, and rank
//! them against a query.
//!
//! The pipeline runs once per build: [`indexer::Indexer`] produces an
//! immutable [`retriever::Retriever`], which is published through an
//! [`handle::IndexHandle`] and shared read-only by every request.

pub mod document;
pub mod error;
pub mod handle;
pub mod in_memory_store;
pub mod indexer;
pub mod retriever;
pub mod vector_store;

pub use error::{Result, RetrievalError};
pub use handle::IndexHandle;
pub use indexer::{IndexReport, Indexer, IndexerConfig};
pub use retriever::{RetrievalResult, Retriever, ScoredChunk, SearchMode};
pub use vector_store::Distance;
