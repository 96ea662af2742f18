//! Test-only mock LLM provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Message};

/// How the mock answers embedding requests.
#[derive(Debug, Clone, Default)]
pub enum MockEmbedding {
    /// Embeddings are not supported.
    #[default]
    Unsupported,
    /// Every text maps to the same vector.
    Fixed(Vec<f32>),
    /// 26-dimensional letter histogram of the lowercased text, so texts
    /// sharing words end up close under cosine similarity.
    LetterHistogram,
    /// Every call fails.
    Failing,
    /// The first `n` calls fail, later calls use the letter histogram.
    FailFirst(usize),
}

#[derive(Debug, Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<String>>>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
    embed_calls: Arc<AtomicUsize>,
    pub default_response: String,
    pub embedding: MockEmbedding,
    pub fail_chat: bool,
    /// Milliseconds to sleep before returning a chat response.
    pub delay_ms: u64,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            embed_calls: Arc::new(AtomicUsize::new(0)),
            default_response: "mock response".into(),
            embedding: MockEmbedding::Unsupported,
            fail_chat: false,
            delay_ms: 0,
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_chat: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: MockEmbedding) -> Self {
        self.embedding = embedding;
        self
    }

    #[must_use]
    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    /// Message lists received by `chat`, oldest first.
    #[must_use]
    pub fn recorded_requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }
}

#[allow(clippy::cast_precision_loss)]
fn letter_histogram(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 26];
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() {
            v[(c as u8 - b'a') as usize] += 1.0;
        }
    }
    v
}

impl LlmProvider for MockProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        if self.fail_chat {
            return Err(LlmError::Other("mock LLM error".into()));
        }
        let mut responses = self
            .responses
            .lock()
            .map_err(|e| LlmError::Other(e.to_string()))?;
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let call = self.embed_calls.fetch_add(1, Ordering::SeqCst);
        match &self.embedding {
            MockEmbedding::Unsupported => Err(LlmError::EmbedUnsupported { provider: "mock" }),
            MockEmbedding::Fixed(v) => Ok(v.clone()),
            MockEmbedding::LetterHistogram => Ok(letter_histogram(text)),
            MockEmbedding::Failing => Err(LlmError::Other("mock embed error".into())),
            MockEmbedding::FailFirst(n) if call < *n => {
                Err(LlmError::Other("mock embed error".into()))
            }
            MockEmbedding::FailFirst(_) => Ok(letter_histogram(text)),
        }
    }

    fn supports_embeddings(&self) -> bool {
        !matches!(self.embedding, MockEmbedding::Unsupported)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
