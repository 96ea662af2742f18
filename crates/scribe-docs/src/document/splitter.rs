use super::types::{Chunk, Document};
use crate::error::RetrievalError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitterConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks of the same page.
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Splits each page independently into windows of at most `chunk_size`
/// characters, preferring to end a window at a paragraph break, then a line
/// break, then a sentence end, then any whitespace.
///
/// Consecutive chunks of a page overlap by exactly `chunk_overlap`
/// characters, so the page is recovered by dropping the first
/// `chunk_overlap` characters of every chunk after the first and
/// concatenating.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    /// # Errors
    ///
    /// Returns [`RetrievalError::Config`] if `chunk_size` is zero or
    /// `chunk_overlap` is not smaller than `chunk_size`.
    pub fn new(config: SplitterConfig) -> Result<Self, RetrievalError> {
        if config.chunk_size == 0 {
            return Err(RetrievalError::Config(
                "chunk_size must be greater than zero".into(),
            ));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(RetrievalError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    #[must_use]
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for page in &document.pages {
            for content in split_page(
                &page.text,
                self.config.chunk_size,
                self.config.chunk_overlap,
            ) {
                chunks.push(Chunk {
                    content,
                    source: document.metadata.source.clone(),
                    page: page.number,
                    chunk_index: chunks.len(),
                });
            }
        }
        chunks
    }
}

fn split_page(text: &str, size: usize, overlap: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= size {
        return vec![text.to_owned()];
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    loop {
        if chars.len() - start <= size {
            pieces.push(chars[start..].iter().collect());
            break;
        }
        let hard_end = start + size;
        // A break must leave the chunk at least half full and must land past
        // the overlap, otherwise the next window would not advance.
        let min_end = start + (size / 2).max(overlap + 1);
        let end = find_break(&chars, min_end, hard_end).unwrap_or(hard_end);
        pieces.push(chars[start..end].iter().collect());
        start = end - overlap;
    }
    pieces
}

/// Latest exclusive end in `min_end..=hard_end` at the strongest available
/// boundary.
fn find_break(chars: &[char], min_end: usize, hard_end: usize) -> Option<usize> {
    let paragraph = |e: usize| e >= 2 && chars[e - 2] == '\n' && chars[e - 1] == '\n';
    let line = |e: usize| chars[e - 1] == '\n';
    let sentence = |e: usize| {
        e >= 2 && chars[e - 1].is_whitespace() && matches!(chars[e - 2], '.' | '?' | '!')
    };
    let word = |e: usize| chars[e - 1].is_whitespace();

    let rules: [&dyn Fn(usize) -> bool; 4] = [&paragraph, &line, &sentence, &word];
    rules
        .iter()
        .find_map(|rule| (min_end..=hard_end).rev().find(|&e| e >= 1 && rule(e)))
}
