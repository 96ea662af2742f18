//! LLM provider abstraction: chat completion and embeddings over OpenAI-compatible APIs.

pub mod any;
pub mod azure;
pub mod error;
pub mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod openai;
pub mod provider;
pub(crate) mod retry;

pub use error::LlmError;
pub use provider::{LlmProvider, Message, Role};
