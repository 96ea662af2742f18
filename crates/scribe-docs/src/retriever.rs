use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use scribe_llm::LlmProvider;
use scribe_llm::any::AnyProvider;

use crate::document::Chunk;
use crate::error::{Result, RetrievalError};
use crate::vector_store::VectorStore;

/// Query terms must be longer than this many characters.
const MIN_KEYWORD_EXCLUSIVE: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Keyword,
    Vector,
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Keyword => "keyword",
            Self::Vector => "vector",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Chunks ranked for one query, best first, at most `k` long.
pub type RetrievalResult = Vec<ScoredChunk>;

/// Split a query into lowercase keywords, dropping short tokens.
#[must_use]
pub fn keywords(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() > MIN_KEYWORD_EXCLUSIVE)
        .collect()
}

/// Sum of non-overlapping literal occurrences of every keyword in `text`,
/// ignoring case.
#[must_use]
pub fn keyword_score(text: &str, keywords: &[String]) -> usize {
    if keywords.is_empty() {
        return 0;
    }
    let text = text.to_lowercase();
    keywords.iter().map(|kw| text.matches(kw.as_str()).count()).sum()
}

/// Term-frequency ranking over the chunk sequence.
#[derive(Debug, Clone)]
pub struct KeywordRetriever {
    chunks: Arc<[Chunk]>,
}

impl KeywordRetriever {
    #[must_use]
    pub fn new(chunks: Arc<[Chunk]>) -> Self {
        Self { chunks }
    }

    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Rank chunks by keyword hits. When no chunk matches, the first `k`
    /// chunks are returned with score 0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn search(&self, query: &str, k: usize) -> RetrievalResult {
        let keywords = keywords(query);
        let mut hits: Vec<(usize, &Chunk)> = self
            .chunks
            .iter()
            .map(|c| (keyword_score(&c.content, &keywords), c))
            .filter(|(score, _)| *score > 0)
            .collect();

        if hits.is_empty() {
            debug!(query_terms = keywords.len(), "no keyword matches, returning leading chunks");
            return self
                .chunks
                .iter()
                .take(k)
                .map(|c| ScoredChunk {
                    chunk: c.clone(),
                    score: 0.0,
                })
                .collect();
        }

        hits.sort_by(|a, b| b.0.cmp(&a.0));
        hits.truncate(k);
        hits.into_iter()
            .map(|(score, c)| ScoredChunk {
                chunk: c.clone(),
                score: score as f32,
            })
            .collect()
    }
}

/// Nearest-neighbour ranking over chunk embeddings, degrading to keyword
/// ranking over the same chunks when the query cannot be embedded or the
/// store returns nothing.
pub struct VectorRetriever {
    store: Arc<dyn VectorStore>,
    provider: Arc<AnyProvider>,
    keyword: KeywordRetriever,
    embed_timeout: Duration,
}

impl VectorRetriever {
    #[must_use]
    pub fn new(
        store: Arc<dyn VectorStore>,
        provider: Arc<AnyProvider>,
        keyword: KeywordRetriever,
        embed_timeout: Duration,
    ) -> Self {
        Self {
            store,
            provider,
            keyword,
            embed_timeout,
        }
    }

    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        self.keyword.chunks()
    }

    pub async fn search(&self, query: &str, k: usize) -> RetrievalResult {
        match self.semantic_search(query, k).await {
            Ok(hits) if !hits.is_empty() => hits,
            Ok(_) => {
                warn!("vector search returned no results, falling back to keyword search");
                self.keyword.search(query, k)
            }
            Err(e) => {
                warn!(error = %e, "vector search failed, falling back to keyword search");
                self.keyword.search(query, k)
            }
        }
    }

    async fn semantic_search(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        let vector = tokio::time::timeout(self.embed_timeout, self.provider.embed(query))
            .await
            .map_err(|_| RetrievalError::EmbedTimeout(self.embed_timeout))??;
        let hits = self.store.search(vector, k).await?;
        let chunks = self.chunks();
        Ok(hits
            .into_iter()
            .filter_map(|h| {
                chunks.get(h.id).map(|c| ScoredChunk {
                    chunk: c.clone(),
                    score: h.score,
                })
            })
            .collect())
    }
}

impl std::fmt::Debug for VectorRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorRetriever")
            .field("chunks", &self.chunks().len())
            .field("provider", &self.provider.name())
            .field("embed_timeout", &self.embed_timeout)
            .finish_non_exhaustive()
    }
}

/// A built, read-only index together with its ranking strategy.
#[derive(Debug)]
pub enum Retriever {
    Keyword(KeywordRetriever),
    Vector(VectorRetriever),
}

impl Retriever {
    /// Rank the indexed chunks against `query`.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::InvalidLimit`] if `k` is zero and
    /// [`RetrievalError::NotInitialized`] if the index holds no chunks.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        if k == 0 {
            return Err(RetrievalError::InvalidLimit);
        }
        if self.is_empty() {
            return Err(RetrievalError::NotInitialized);
        }
        let result = match self {
            Self::Keyword(r) => r.search(query, k),
            Self::Vector(r) => r.search(query, k).await,
        };
        debug!(mode = %self.mode(), k, returned = result.len(), "retrieved chunks");
        Ok(result)
    }

    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        match self {
            Self::Keyword(r) => r.chunks(),
            Self::Vector(r) => r.chunks(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks().is_empty()
    }

    #[must_use]
    pub fn mode(&self) -> SearchMode {
        match self {
            Self::Keyword(_) => SearchMode::Keyword,
            Self::Vector(_) => SearchMode::Vector,
        }
    }
}
