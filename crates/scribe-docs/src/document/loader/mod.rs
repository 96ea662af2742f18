#[cfg(feature = "pdf")]
mod pdf;
mod text;

#[cfg(feature = "pdf")]
pub use pdf::PdfLoader;
pub use text::TextLoader;

use std::path::Path;

use super::{DocumentError, DocumentLoader};

/// Reject files above `max_size` before reading them.
pub(crate) async fn check_size(path: &Path, max_size: u64) -> Result<(), DocumentError> {
    let size = tokio::fs::metadata(path).await?.len();
    if size > max_size {
        return Err(DocumentError::FileTooLarge {
            size,
            limit: max_size,
        });
    }
    Ok(())
}

/// Loaders for the configured formats: PDF always (when compiled in), plain
/// text and markdown only when `include_text` is set.
#[must_use]
pub fn default_loaders(include_text: bool, max_file_size: u64) -> Vec<Box<dyn DocumentLoader>> {
    let mut loaders: Vec<Box<dyn DocumentLoader>> = Vec::new();
    #[cfg(feature = "pdf")]
    loaders.push(Box::new(PdfLoader { max_file_size }));
    if include_text {
        loaders.push(Box::new(TextLoader { max_file_size }));
    }
    loaders
}
