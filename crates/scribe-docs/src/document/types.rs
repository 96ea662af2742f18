use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// Path relative to the documents root, `/`-separated.
    pub source: String,
    pub content_type: String,
}

/// One page of extracted text. Formats without pages yield a single page
/// with no number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub number: Option<u32>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub pages: Vec<Page>,
    pub metadata: DocumentMetadata,
}

/// A contiguous span of one page of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub content: String,
    pub source: String,
    /// 1-based page number, when the source format has pages.
    pub page: Option<u32>,
    /// Position of this chunk within its document.
    pub chunk_index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_serializes_missing_page_as_null() {
        let chunk = Chunk {
            content: "x".into(),
            source: "notes.txt".into(),
            page: None,
            chunk_index: 0,
        };
        let json = serde_json::to_value(&chunk).unwrap();
        assert!(json["page"].is_null());
        assert_eq!(json["source"], "notes.txt");
    }
}
