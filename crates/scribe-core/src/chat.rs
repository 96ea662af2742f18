use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use scribe_docs::{IndexHandle, RetrievalError};
use scribe_llm::any::AnyProvider;
use scribe_llm::{LlmError, LlmProvider};

use crate::composer::Composer;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Prompt is required")]
    EmptyPrompt,

    #[error("document index is not initialized")]
    NotInitialized,

    #[error("model invocation failed: {0}")]
    ModelInvocation(#[source] LlmError),

    #[error("model did not respond within {0:?}")]
    Timeout(Duration),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatError {
    /// Failures caused by a missing index or an unreachable model, as
    /// opposed to bugs or bad input.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::NotInitialized | Self::ModelInvocation(_) | Self::Timeout(_)
        )
    }
}

impl From<RetrievalError> for ChatError {
    fn from(e: RetrievalError) -> Self {
        match e {
            RetrievalError::NotInitialized => Self::NotInitialized,
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Answers questions from the currently installed document index.
#[derive(Debug, Clone)]
pub struct ChatService {
    index: IndexHandle,
    provider: Arc<AnyProvider>,
    composer: Composer,
    top_k: usize,
    llm_timeout: Duration,
}

impl ChatService {
    #[must_use]
    pub fn new(index: IndexHandle, provider: Arc<AnyProvider>) -> Self {
        Self {
            index,
            provider,
            composer: Composer::default(),
            top_k: 5,
            llm_timeout: Duration::from_secs(120),
        }
    }

    #[must_use]
    pub fn with_composer(mut self, composer: Composer) -> Self {
        self.composer = composer;
        self
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    #[must_use]
    pub fn index(&self) -> &IndexHandle {
        &self.index
    }

    /// Retrieve context for `prompt`, compose the messages and ask the model.
    ///
    /// A model reply with no content is returned as an empty string.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::EmptyPrompt`] for blank input,
    /// [`ChatError::NotInitialized`] when no usable index is installed, and
    /// [`ChatError::ModelInvocation`] or [`ChatError::Timeout`] when the model
    /// call fails.
    pub async fn answer(&self, prompt: &str) -> Result<String, ChatError> {
        if prompt.trim().is_empty() {
            return Err(ChatError::EmptyPrompt);
        }

        let result = self.index.retrieve(prompt, self.top_k).await?;
        let messages = self.composer.compose(&result, prompt);
        debug!(chunks = result.len(), "composed prompt");

        let reply = tokio::time::timeout(self.llm_timeout, self.provider.chat(&messages))
            .await
            .map_err(|_| {
                error!(timeout = ?self.llm_timeout, "model invocation timed out");
                ChatError::Timeout(self.llm_timeout)
            })?
            .map_err(|e| {
                error!(error = %e, "model invocation failed");
                ChatError::ModelInvocation(e)
            })?;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use scribe_docs::Retriever;
    use scribe_docs::document::Chunk;
    use scribe_docs::retriever::KeywordRetriever;
    use scribe_llm::Role;
    use scribe_llm::mock::MockProvider;

    use super::*;

    fn index_with(contents: &[&str]) -> IndexHandle {
        let chunks: Vec<Chunk> = contents
            .iter()
            .enumerate()
            .map(|(i, c)| Chunk {
                content: (*c).to_owned(),
                source: "handbook.pdf".into(),
                page: Some(u32::try_from(i + 1).unwrap()),
                chunk_index: i,
            })
            .collect();
        let handle = IndexHandle::new();
        handle.install(Retriever::Keyword(KeywordRetriever::new(chunks.into())));
        handle
    }

    fn service(index: IndexHandle, mock: MockProvider) -> ChatService {
        ChatService::new(index, Arc::new(AnyProvider::Mock(mock)))
    }

    #[tokio::test]
    async fn answer_sends_composed_context() {
        let mock = MockProvider::with_responses(vec!["Reboot it.".into()]);
        let svc = service(
            index_with(&["Printers jam often.", "To fix the router, reboot it."]),
            mock.clone(),
        );

        let reply = svc.answer("How to fix the router").await.unwrap();
        assert_eq!(reply, "Reboot it.");

        let requests = mock.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0][0].role, Role::System);
        let user = &requests[0][1].content;
        assert!(user.starts_with(
            "Context information is below.\n\nSource: handbook.pdf, Page: 2\nTo fix the router"
        ));
        assert!(user.ends_with("answer the following question: How to fix the router"));
    }

    #[tokio::test]
    async fn blank_prompt_rejected_before_retrieval() {
        let mock = MockProvider::default();
        let svc = service(index_with(&["x"]), mock.clone());
        assert!(matches!(
            svc.answer("   ").await,
            Err(ChatError::EmptyPrompt)
        ));
        assert!(mock.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn missing_index_is_not_initialized() {
        let svc = service(IndexHandle::new(), MockProvider::default());
        let err = svc.answer("anything").await.unwrap_err();
        assert!(matches!(err, ChatError::NotInitialized));
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn model_failure_is_unavailable() {
        let svc = service(index_with(&["content"]), MockProvider::failing());
        let err = svc.answer("question here").await.unwrap_err();
        assert!(matches!(err, ChatError::ModelInvocation(_)));
        assert!(err.is_unavailable());
        assert!(err.to_string().contains("mock LLM error"));
    }

    #[tokio::test]
    async fn slow_model_times_out() {
        let svc = service(index_with(&["content"]), MockProvider::default().with_delay(500))
            .with_llm_timeout(Duration::from_millis(20));
        let err = svc.answer("question here").await.unwrap_err();
        assert!(matches!(err, ChatError::Timeout(_)));
    }

    #[tokio::test]
    async fn empty_model_reply_is_passed_through() {
        let svc = service(
            index_with(&["content"]),
            MockProvider::with_responses(vec![String::new()]),
        );
        assert_eq!(svc.answer("question here").await.unwrap(), "");
    }

    #[tokio::test]
    async fn zero_top_k_is_internal() {
        let svc = service(index_with(&["content"]), MockProvider::default()).with_top_k(0);
        let err = svc.answer("question").await.unwrap_err();
        assert!(matches!(err, ChatError::Internal(_)));
        assert!(!err.is_unavailable());
    }
}
