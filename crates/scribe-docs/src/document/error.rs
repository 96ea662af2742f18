use thiserror::Error;

/// Failure to turn one file into a [`super::Document`].
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("document is {size} bytes, limit is {limit}")]
    FileTooLarge { size: u64, limit: u64 },

    #[cfg(feature = "pdf")]
    #[error("failed to extract PDF text: {0}")]
    Pdf(String),
}
