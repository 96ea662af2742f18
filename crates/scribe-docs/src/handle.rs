use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{Result, RetrievalError};
use crate::retriever::{RetrievalResult, Retriever};

/// Shared, swappable reference to the current index.
///
/// Readers take a cheap `Arc` snapshot and keep using it even if a rebuild
/// installs a newer index meanwhile.
#[derive(Clone)]
pub struct IndexHandle {
    tx: Arc<watch::Sender<Option<Arc<Retriever>>>>,
}

impl IndexHandle {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Replace the current index.
    pub fn install(&self, retriever: Retriever) {
        tracing::info!(
            mode = %retriever.mode(),
            chunks = retriever.len(),
            "installed document index"
        );
        self.tx.send_replace(Some(Arc::new(retriever)));
    }

    /// # Errors
    ///
    /// Returns [`RetrievalError::NotInitialized`] until an index is installed.
    pub fn retriever(&self) -> Result<Arc<Retriever>> {
        self.tx.borrow().clone().ok_or(RetrievalError::NotInitialized)
    }

    /// Whether a non-empty index is installed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.tx.borrow().as_ref().is_some_and(|r| !r.is_empty())
    }

    /// # Errors
    ///
    /// See [`Retriever::retrieve`]; also fails with
    /// [`RetrievalError::NotInitialized`] when no index is installed.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        let retriever = self.retriever()?;
        retriever.retrieve(query, k).await
    }
}

impl Default for IndexHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexHandle")
            .field("ready", &self.is_ready())
            .finish()
    }
}
