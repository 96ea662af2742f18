use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use scribe_llm::{LlmError, LlmProvider};
use scribe_llm::any::AnyProvider;

use crate::document::loader::default_loaders;
use crate::document::{
    Chunk, DEFAULT_MAX_FILE_SIZE, SkippedFile, SplitterConfig, TextSplitter, load_directory,
};
use crate::error::{Result, RetrievalError};
use crate::in_memory_store::InMemoryVectorStore;
use crate::retriever::{KeywordRetriever, Retriever, SearchMode, VectorRetriever};
use crate::vector_store::{Distance, VectorPoint, VectorStore};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub root: PathBuf,
    pub include_text: bool,
    pub max_file_size: u64,
    pub splitter: SplitterConfig,
    pub mode: SearchMode,
    pub distance: Distance,
    /// Chunks per embedding request.
    pub embed_batch_size: usize,
    /// Extra attempts per batch before falling back to keyword mode.
    pub embed_retries: u32,
    /// Delay before the first retry; doubles on each further attempt.
    pub embed_backoff: Duration,
    pub embed_timeout: Duration,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("docs"),
            include_text: false,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            splitter: SplitterConfig::default(),
            mode: SearchMode::Keyword,
            distance: Distance::Cosine,
            embed_batch_size: 32,
            embed_retries: 2,
            embed_backoff: Duration::from_millis(250),
            embed_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    pub files_scanned: usize,
    pub files_loaded: usize,
    pub skipped: Vec<SkippedFile>,
    pub pages: usize,
    pub chunks_created: usize,
    /// Mode actually serving queries.
    pub mode: SearchMode,
    /// Vector mode was requested but embedding failed.
    pub degraded: bool,
    /// Length of the stored chunk embeddings; `None` outside vector mode.
    pub embedding_dimension: Option<usize>,
    /// blake3 hex digest of the chunk sequence.
    pub fingerprint: String,
    pub duration_ms: u64,
}

/// Builds a fresh index from the documents root: load, chunk, then embed
/// when vector mode is configured.
pub struct Indexer {
    config: IndexerConfig,
    provider: Arc<AnyProvider>,
}

impl Indexer {
    #[must_use]
    pub fn new(config: IndexerConfig, provider: Arc<AnyProvider>) -> Self {
        Self { config, provider }
    }

    #[must_use]
    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Run the full pipeline once.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Config`] for invalid chunking parameters and
    /// [`RetrievalError::Load`] when the documents root is unusable. Embedding
    /// failures do not fail the build; they degrade it to keyword mode.
    pub async fn build(&self) -> Result<(Retriever, IndexReport)> {
        let start = Instant::now();
        let splitter = TextSplitter::new(self.config.splitter.clone())?;
        if self.config.embed_batch_size == 0 {
            return Err(RetrievalError::Config(
                "embed_batch_size must be greater than zero".into(),
            ));
        }

        let loaders = default_loaders(self.config.include_text, self.config.max_file_size);
        let outcome = load_directory(&self.config.root, &loaders).await?;

        let mut report = IndexReport {
            files_loaded: outcome.documents.len(),
            files_scanned: outcome.documents.len() + outcome.skipped.len(),
            skipped: outcome.skipped,
            ..IndexReport::default()
        };

        let mut chunks = Vec::new();
        for doc in &outcome.documents {
            report.pages += doc.pages.len();
            chunks.extend(splitter.split(doc));
        }
        report.chunks_created = chunks.len();
        report.fingerprint = fingerprint(&chunks);

        info!(
            root = %self.config.root.display(),
            files = report.files_loaded,
            skipped = report.skipped.len(),
            chunks = report.chunks_created,
            "documents chunked"
        );
        if chunks.is_empty() {
            warn!(root = %self.config.root.display(), "no documents found to index");
        }

        let chunks: Arc<[Chunk]> = chunks.into();
        let keyword = KeywordRetriever::new(Arc::clone(&chunks));

        let retriever = match self.config.mode {
            SearchMode::Vector if !chunks.is_empty() && !self.provider.supports_embeddings() => {
                warn!(
                    provider = self.provider.name(),
                    "provider has no embedding model, serving keyword search instead"
                );
                report.degraded = true;
                Retriever::Keyword(keyword)
            }
            SearchMode::Vector if !chunks.is_empty() => match self.embed_chunks(&chunks).await {
                Ok(store) => {
                    report.embedding_dimension = store.dimension();
                    Retriever::Vector(VectorRetriever::new(
                        Arc::new(store),
                        Arc::clone(&self.provider),
                        keyword,
                        self.config.embed_timeout,
                    ))
                }
                Err(e) => {
                    warn!(error = %e, "embedding failed, serving keyword search instead");
                    report.degraded = true;
                    Retriever::Keyword(keyword)
                }
            },
            _ => Retriever::Keyword(keyword),
        };

        report.mode = retriever.mode();
        report.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            mode = %report.mode,
            degraded = report.degraded,
            duration_ms = report.duration_ms,
            "index built"
        );
        Ok((retriever, report))
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<InMemoryVectorStore> {
        let store = InMemoryVectorStore::new(self.config.distance);
        let batch_size = self.config.embed_batch_size;
        let total = chunks.len();

        for (batch_no, batch) in chunks.chunks(batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = self.embed_with_retry(&texts).await?;
            if vectors.len() != texts.len() {
                return Err(RetrievalError::Index(format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    vectors.len()
                )));
            }
            let offset = batch_no * batch_size;
            let points = vectors
                .into_iter()
                .enumerate()
                .map(|(i, vector)| VectorPoint {
                    id: offset + i,
                    vector,
                })
                .collect();
            store.upsert(points).await?;
            info!(
                embedded = (offset + batch.len()).min(total),
                total, "embedding progress"
            );
        }
        Ok(store)
    }

    async fn embed_with_retry(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut attempt: u32 = 0;
        loop {
            let err = match tokio::time::timeout(
                self.config.embed_timeout,
                self.provider.embed_batch(texts),
            )
            .await
            {
                Ok(Ok(vectors)) => return Ok(vectors),
                Ok(Err(e @ LlmError::EmbedUnsupported { .. })) => {
                    return Err(RetrievalError::Embedding(e));
                }
                Ok(Err(e)) => RetrievalError::Embedding(e),
                Err(_) => RetrievalError::EmbedTimeout(self.config.embed_timeout),
            };
            if attempt >= self.config.embed_retries {
                return Err(RetrievalError::Index(err.to_string()));
            }
            let delay = backoff(self.config.embed_backoff, attempt);
            warn!(attempt = attempt + 1, error = %err, ?delay, "embedding batch failed, retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

/// Stable digest of the chunk sequence, used to confirm that rebuilding an
/// unchanged directory yields the same index.
#[must_use]
pub fn fingerprint(chunks: &[Chunk]) -> String {
    let mut hasher = blake3::Hasher::new();
    for chunk in chunks {
        hasher.update(chunk.source.as_bytes());
        hasher.update(&[0]);
        match chunk.page {
            Some(p) => hasher.update(&p.to_le_bytes()),
            None => hasher.update(b"-"),
        };
        hasher.update(&(chunk.chunk_index as u64).to_le_bytes());
        hasher.update(&(chunk.content.len() as u64).to_le_bytes());
        hasher.update(chunk.content.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use scribe_llm::mock::{MockEmbedding, MockProvider};

    use super::*;

    fn write_docs(dir: &std::path::Path) {
        std::fs::write(
            dir.join("refunds.txt"),
            "Refunds are issued within thirty days of purchase.",
        )
        .unwrap();
        std::fs::write(dir.join("shipping.md"), "Shipping takes five business days.").unwrap();
    }

    fn config(root: &std::path::Path, mode: SearchMode) -> IndexerConfig {
        IndexerConfig {
            root: root.to_path_buf(),
            include_text: true,
            mode,
            embed_backoff: Duration::from_millis(1),
            ..IndexerConfig::default()
        }
    }

    fn provider(embedding: MockEmbedding) -> Arc<AnyProvider> {
        Arc::new(AnyProvider::Mock(
            MockProvider::default().with_embedding(embedding),
        ))
    }

    #[tokio::test]
    async fn keyword_build_reports_counts() {
        let dir = tempfile::tempdir().unwrap();
        write_docs(dir.path());

        let indexer = Indexer::new(
            config(dir.path(), SearchMode::Keyword),
            provider(MockEmbedding::Unsupported),
        );
        let (retriever, report) = indexer.build().await.unwrap();
        assert_eq!(retriever.mode(), SearchMode::Keyword);
        assert_eq!(report.files_scanned, 2);
        assert_eq!(report.files_loaded, 2);
        assert_eq!(report.chunks_created, 2);
        assert_eq!(retriever.chunks()[0].source, "refunds.txt");
        assert!(!report.degraded);
        assert_eq!(report.fingerprint.len(), 64);
    }

    #[tokio::test]
    async fn text_files_ignored_unless_enabled() {
        let dir = tempfile::tempdir().unwrap();
        write_docs(dir.path());

        let mut cfg = config(dir.path(), SearchMode::Keyword);
        cfg.include_text = false;
        let (retriever, report) = Indexer::new(cfg, provider(MockEmbedding::Unsupported))
            .build()
            .await
            .unwrap();
        assert!(retriever.is_empty());
        assert_eq!(report.files_scanned, 0);
    }

    #[tokio::test]
    async fn vector_build_embeds_every_chunk() {
        let dir = tempfile::tempdir().unwrap();
        write_docs(dir.path());

        let mut cfg = config(dir.path(), SearchMode::Vector);
        cfg.embed_batch_size = 1;
        let (retriever, report) = Indexer::new(cfg, provider(MockEmbedding::LetterHistogram))
            .build()
            .await
            .unwrap();
        assert_eq!(retriever.mode(), SearchMode::Vector);
        assert_eq!(report.mode, SearchMode::Vector);
        assert!(!report.degraded);

        let result = retriever.retrieve("shipping days", 1).await.unwrap();
        assert_eq!(result[0].chunk.source, "shipping.md");
        assert_eq!(report.embedding_dimension, Some(26));
    }

    #[tokio::test]
    async fn provider_without_embeddings_degrades_without_retrying() {
        let dir = tempfile::tempdir().unwrap();
        write_docs(dir.path());

        let mut cfg = config(dir.path(), SearchMode::Vector);
        cfg.embed_retries = 5;
        cfg.embed_backoff = Duration::from_secs(30);
        let mock = MockProvider::default();
        let indexer = Indexer::new(cfg, Arc::new(AnyProvider::Mock(mock.clone())));
        let build = indexer.build();
        let (retriever, report) = tokio::time::timeout(Duration::from_secs(5), build)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(retriever.mode(), SearchMode::Keyword);
        assert!(report.degraded);
        assert!(report.embedding_dimension.is_none());
        assert_eq!(mock.embed_calls(), 0);
    }

    #[test]
    fn report_serializes_skipped_files() {
        let report = IndexReport {
            files_scanned: 2,
            files_loaded: 1,
            skipped: vec![SkippedFile {
                source: "scans/broken.pdf".into(),
                reason: "failed to extract PDF text: bad xref".into(),
            }],
            ..IndexReport::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["skipped"][0]["source"], "scans/broken.pdf");
        assert_eq!(json["mode"], "keyword");
        assert!(json["embedding_dimension"].is_null());
    }

    #[tokio::test]
    async fn vector_build_degrades_to_keyword() {
        let dir = tempfile::tempdir().unwrap();
        write_docs(dir.path());

        let (retriever, report) = Indexer::new(
            config(dir.path(), SearchMode::Vector),
            provider(MockEmbedding::Failing),
        )
        .build()
        .await
        .unwrap();
        assert_eq!(retriever.mode(), SearchMode::Keyword);
        assert_eq!(report.mode, SearchMode::Keyword);
        assert!(report.degraded);

        let result = retriever.retrieve("refunds issued", 5).await.unwrap();
        assert_eq!(result[0].chunk.source, "refunds.txt");
    }

    #[tokio::test]
    async fn transient_embedding_failure_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        write_docs(dir.path());

        let (retriever, report) = Indexer::new(
            config(dir.path(), SearchMode::Vector),
            provider(MockEmbedding::FailFirst(1)),
        )
        .build()
        .await
        .unwrap();
        assert_eq!(retriever.mode(), SearchMode::Vector);
        assert!(!report.degraded);
    }

    #[tokio::test]
    async fn inconsistent_dimensions_degrade() {
        let dir = tempfile::tempdir().unwrap();
        write_docs(dir.path());

        let mut cfg = config(dir.path(), SearchMode::Vector);
        cfg.embed_batch_size = 1;
        cfg.embed_retries = 0;
        let mock = MockProvider::default().with_embedding(MockEmbedding::Fixed(Vec::new()));
        let (_, report) = Indexer::new(cfg, Arc::new(AnyProvider::Mock(mock)))
            .build()
            .await
            .unwrap();
        assert!(report.degraded);
    }

    #[tokio::test]
    async fn missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Indexer::new(
            config(&dir.path().join("nope"), SearchMode::Keyword),
            provider(MockEmbedding::Unsupported),
        )
        .build()
        .await;
        assert!(matches!(result, Err(RetrievalError::Load { .. })));
    }

    #[tokio::test]
    async fn invalid_overlap_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path(), SearchMode::Keyword);
        cfg.splitter.chunk_overlap = cfg.splitter.chunk_size;
        let result = Indexer::new(cfg, provider(MockEmbedding::Unsupported))
            .build()
            .await;
        assert!(matches!(result, Err(RetrievalError::Config(_))));
    }

    #[tokio::test]
    async fn rebuild_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write_docs(dir.path());
        let indexer = Indexer::new(
            config(dir.path(), SearchMode::Keyword),
            provider(MockEmbedding::Unsupported),
        );

        let (first, a) = indexer.build().await.unwrap();
        let (second, b) = indexer.build().await.unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_eq!(first.chunks(), second.chunks());
    }

    #[test]
    fn fingerprint_changes_with_content() {
        let chunk = |content: &str| Chunk {
            content: content.into(),
            source: "a.pdf".into(),
            page: Some(1),
            chunk_index: 0,
        };
        assert_ne!(fingerprint(&[chunk("a")]), fingerprint(&[chunk("b")]));
        assert_eq!(fingerprint(&[chunk("a")]), fingerprint(&[chunk("a")]));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff(base, 0), Duration::from_millis(100));
        assert_eq!(backoff(base, 2), Duration::from_millis(400));
        assert_eq!(backoff(base, 40), MAX_BACKOFF);
    }
}
