use std::path::Path;

use super::super::{
    DEFAULT_MAX_FILE_SIZE, Document, DocumentError, DocumentLoader, DocumentMetadata, LoadFuture,
    Page,
};
use super::check_size;

/// Extracts text page by page. Page numbers are 1-based.
pub struct PdfLoader {
    pub max_file_size: u64,
}

impl Default for PdfLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl DocumentLoader for PdfLoader {
    fn load(&self, path: &Path) -> LoadFuture<'_> {
        let path = path.to_path_buf();
        let max_size = self.max_file_size;
        Box::pin(async move {
            check_size(&path, max_size).await?;

            let source = path.display().to_string();
            let path_buf = path.clone();
            // pdf-extract can panic on malformed input; the join error turns
            // that into an ordinary load failure.
            let texts = tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text_by_pages(&path_buf)
                    .map_err(|e| DocumentError::Pdf(e.to_string()))
            })
            .await
            .map_err(|e| DocumentError::Io(std::io::Error::other(e)))??;

            let pages = texts
                .into_iter()
                .enumerate()
                .map(|(i, text)| Page {
                    number: Some(u32::try_from(i + 1).unwrap_or(u32::MAX)),
                    text,
                })
                .collect();

            Ok(vec![Document {
                pages,
                metadata: DocumentMetadata {
                    source,
                    content_type: "application/pdf".to_owned(),
                },
            }])
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }
}
