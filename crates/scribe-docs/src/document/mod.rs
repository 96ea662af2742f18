pub mod error;
pub mod loader;
pub mod splitter;
pub mod types;
pub mod walk;

pub use error::DocumentError;
pub use loader::TextLoader;
pub use splitter::{SplitterConfig, TextSplitter};
pub use types::{Chunk, Document, DocumentMetadata, Page};
pub use walk::{LoadOutcome, SkippedFile, discover, load_directory};

#[cfg(feature = "pdf")]
pub use loader::PdfLoader;

/// Default maximum file size: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Future returned by [`DocumentLoader::load`].
pub type LoadFuture<'a> = std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<Vec<Document>, DocumentError>> + Send + 'a>,
>;

pub trait DocumentLoader: Send + Sync {
    /// Read one file into documents, each carrying its ordered pages.
    fn load(&self, path: &std::path::Path) -> LoadFuture<'_>;

    /// Lowercase extensions, without the leading dot.
    fn supported_extensions(&self) -> &[&str];
}
