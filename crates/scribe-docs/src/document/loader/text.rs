use std::path::Path;

use super::super::{
    DEFAULT_MAX_FILE_SIZE, Document, DocumentLoader, DocumentMetadata, LoadFuture, Page,
};
use super::check_size;

/// Plain text and markdown. The whole file becomes one unnumbered page.
pub struct TextLoader {
    pub max_file_size: u64,
}

impl Default for TextLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl DocumentLoader for TextLoader {
    fn load(&self, path: &Path) -> LoadFuture<'_> {
        let path = path.to_path_buf();
        let max_size = self.max_file_size;
        Box::pin(async move {
            check_size(&path, max_size).await?;

            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase)
                .unwrap_or_default();
            let content_type = match ext.as_str() {
                "md" | "markdown" => "text/markdown",
                _ => "text/plain",
            };

            let bytes = tokio::fs::read(&path).await?;
            let text = String::from_utf8_lossy(&bytes).into_owned();

            Ok(vec![Document {
                pages: vec![Page { number: None, text }],
                metadata: DocumentMetadata {
                    source: path.display().to_string(),
                    content_type: content_type.to_owned(),
                },
            }])
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["txt", "md", "markdown"]
    }
}

#[cfg(test)]
mod tests {
    use super::super::super::DocumentError;
    use super::*;

    #[tokio::test]
    async fn load_text_file_as_single_page() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "hello world").unwrap();

        let docs = TextLoader::default().load(&file).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].pages.len(), 1);
        assert_eq!(docs[0].pages[0].text, "hello world");
        assert_eq!(docs[0].pages[0].number, None);
        assert_eq!(docs[0].metadata.content_type, "text/plain");
    }

    #[tokio::test]
    async fn uppercase_markdown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("README.MD");
        std::fs::write(&file, "# Title").unwrap();

        let docs = TextLoader::default().load(&file).await.unwrap();
        assert_eq!(docs[0].metadata.content_type, "text/markdown");
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bin.txt");
        std::fs::write(&file, [b'o', b'k', 0xff]).unwrap();

        let docs = TextLoader::default().load(&file).await.unwrap();
        assert!(docs[0].pages[0].text.starts_with("ok"));
    }

    #[tokio::test]
    async fn load_nonexistent_file() {
        let result = TextLoader::default()
            .load(Path::new("/nonexistent/file.txt"))
            .await;
        assert!(matches!(result, Err(DocumentError::Io(_))));
    }

    #[tokio::test]
    async fn file_too_large_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.txt");
        std::fs::write(&file, "xy").unwrap();

        let loader = TextLoader { max_file_size: 1 };
        let result = loader.load(&file).await;
        assert!(matches!(result, Err(DocumentError::FileTooLarge { size: 2, .. })));
    }
}
