use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use scribe_docs::document::{DEFAULT_MAX_FILE_SIZE, SplitterConfig};
use scribe_docs::{Distance, IndexerConfig, SearchMode};

use crate::vault::Secret;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

/// LLM provider backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Azure,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Azure => "azure",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_model() -> String {
    "gpt-4o".into()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_embedding_model() -> Option<String> {
    Some("text-embedding-3-small".into())
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
    /// Set to an empty string to disable embeddings.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: default_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            embedding_model: default_embedding_model(),
            azure: None,
        }
    }
}

fn default_azure_api_version() -> String {
    scribe_llm::azure::DEFAULT_API_VERSION.into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AzureConfig {
    /// Resource name, the `{instance}` in `{instance}.openai.azure.com`.
    #[serde(default)]
    pub instance: String,
    /// Chat completion deployment.
    #[serde(default)]
    pub deployment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_deployment: Option<String>,
    #[serde(default = "default_azure_api_version")]
    pub api_version: String,
    /// Full endpoint override, mainly for proxies and tests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            instance: String::new(),
            deployment: String::new(),
            embedding_deployment: None,
            api_version: default_azure_api_version(),
            endpoint: None,
        }
    }
}

fn default_documents_root() -> PathBuf {
    PathBuf::from("docs")
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocumentsConfig {
    #[serde(default = "default_documents_root")]
    pub root: PathBuf,
    /// Also index `.txt`, `.md` and `.markdown` files.
    #[serde(default)]
    pub include_text: bool,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            root: default_documents_root(),
            include_text: false,
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

fn default_embed_batch_size() -> usize {
    32
}

fn default_embed_retries() -> u32 {
    2
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    #[serde(default)]
    pub mode: SearchMode,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,
    #[serde(default = "default_embed_retries")]
    pub embed_retries: u32,
    #[serde(default)]
    pub distance: Distance,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::default(),
            top_k: default_top_k(),
            embed_batch_size: default_embed_batch_size(),
            embed_retries: default_embed_retries(),
            distance: Distance::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PromptConfig {
    /// Replaces the built-in system instruction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

fn default_gateway_bind() -> String {
    "127.0.0.1".into()
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_gateway_rate_limit() -> u32 {
    120
}

fn default_gateway_max_body() -> usize {
    1_048_576
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Requests per minute per client IP. Zero disables limiting.
    #[serde(default = "default_gateway_rate_limit")]
    pub rate_limit: u32,
    #[serde(default = "default_gateway_max_body")]
    pub max_body_size: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_gateway_bind(),
            port: default_gateway_port(),
            rate_limit: default_gateway_rate_limit(),
            max_body_size: default_gateway_max_body(),
        }
    }
}

fn default_llm_timeout() -> u64 {
    120
}

fn default_embedding_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_llm_timeout")]
    pub llm_seconds: u64,
    #[serde(default = "default_embedding_timeout")]
    pub embedding_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            llm_seconds: default_llm_timeout(),
            embedding_seconds: default_embedding_timeout(),
        }
    }
}

impl TimeoutConfig {
    #[must_use]
    pub fn llm(&self) -> Duration {
        Duration::from_secs(self.llm_seconds)
    }

    #[must_use]
    pub fn embedding(&self) -> Duration {
        Duration::from_secs(self.embedding_seconds)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedSecrets {
    pub openai_api_key: Option<Secret>,
    pub azure_api_key: Option<Secret>,
}

impl Config {
    /// Indexing parameters derived from the documents, chunking, retrieval
    /// and timeout sections.
    #[must_use]
    pub fn indexer_config(&self) -> IndexerConfig {
        IndexerConfig {
            root: self.documents.root.clone(),
            include_text: self.documents.include_text,
            max_file_size: self.documents.max_file_size,
            splitter: SplitterConfig {
                chunk_size: self.chunking.chunk_size,
                chunk_overlap: self.chunking.chunk_overlap,
            },
            mode: self.retrieval.mode,
            distance: self.retrieval.distance,
            embed_batch_size: self.retrieval.embed_batch_size,
            embed_retries: self.retrieval.embed_retries,
            embed_timeout: self.timeouts.embedding(),
            ..IndexerConfig::default()
        }
    }
}
