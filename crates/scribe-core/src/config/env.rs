use std::path::PathBuf;

use super::{AzureConfig, Config, ProviderKind};

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_llm();
        self.apply_env_overrides_azure();
        self.apply_env_overrides_pipeline();
        self.apply_env_overrides_gateway();
    }

    fn apply_env_overrides_llm(&mut self) {
        if let Ok(v) = std::env::var("SCRIBE_LLM_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.llm.provider = kind;
            } else {
                tracing::warn!("ignoring invalid SCRIBE_LLM_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("SCRIBE_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("SCRIBE_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("SCRIBE_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = Some(v);
        }
        if let Ok(v) = std::env::var("SCRIBE_LLM_MAX_TOKENS")
            && let Ok(n) = v.parse::<u32>()
        {
            self.llm.max_tokens = n;
        }
        if let Ok(v) = std::env::var("SCRIBE_LLM_TEMPERATURE")
            && let Ok(t) = v.parse::<f32>()
        {
            self.llm.temperature = t;
        }
    }

    /// The `AZURE_OPENAI_*` variables select Azure unless the provider is set
    /// explicitly through `SCRIBE_LLM_PROVIDER`.
    fn apply_env_overrides_azure(&mut self) {
        let instance = std::env::var("AZURE_OPENAI_INSTANCE_NAME").ok();
        let deployment = std::env::var("AZURE_OPENAI_DEPLOYMENT_NAME").ok();
        let version = std::env::var("AZURE_OPENAI_VERSION").ok();
        let embedding = std::env::var("AZURE_OPENAI_EMBEDDING_DEPLOYMENT_NAME").ok();

        if instance.is_none() && deployment.is_none() && version.is_none() && embedding.is_none()
        {
            return;
        }

        let azure = self.llm.azure.get_or_insert_with(AzureConfig::default);
        if let Some(v) = instance.clone() {
            azure.instance = v;
        }
        if let Some(v) = deployment {
            azure.deployment = v;
        }
        if let Some(v) = version {
            azure.api_version = v;
        }
        if let Some(v) = embedding {
            azure.embedding_deployment = Some(v);
        }
        if instance.is_some() && std::env::var("SCRIBE_LLM_PROVIDER").is_err() {
            self.llm.provider = ProviderKind::Azure;
        }
    }

    fn apply_env_overrides_pipeline(&mut self) {
        if let Ok(v) = std::env::var("SCRIBE_DOCUMENTS_ROOT") {
            self.documents.root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("SCRIBE_DOCUMENTS_INCLUDE_TEXT")
            && let Ok(enabled) = v.parse::<bool>()
        {
            self.documents.include_text = enabled;
        }
        if let Ok(v) = std::env::var("SCRIBE_CHUNK_SIZE")
            && let Ok(n) = v.parse::<usize>()
        {
            self.chunking.chunk_size = n;
        }
        if let Ok(v) = std::env::var("SCRIBE_CHUNK_OVERLAP")
            && let Ok(n) = v.parse::<usize>()
        {
            self.chunking.chunk_overlap = n;
        }
        if let Ok(v) = std::env::var("SCRIBE_RETRIEVAL_MODE") {
            if let Ok(mode) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.retrieval.mode = mode;
            } else {
                tracing::warn!("ignoring invalid SCRIBE_RETRIEVAL_MODE value: {v}");
            }
        }
        if let Ok(v) = std::env::var("SCRIBE_RETRIEVAL_TOP_K")
            && let Ok(k) = v.parse::<usize>()
        {
            self.retrieval.top_k = k;
        }
        if let Ok(v) = std::env::var("SCRIBE_TIMEOUT_LLM")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.llm_seconds = secs;
        }
        if let Ok(v) = std::env::var("SCRIBE_TIMEOUT_EMBEDDING")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.embedding_seconds = secs;
        }
    }

    fn apply_env_overrides_gateway(&mut self) {
        if let Ok(v) = std::env::var("SCRIBE_GATEWAY_BIND") {
            self.gateway.bind = v;
        }
        // `SCRIBE_GATEWAY_PORT` wins over the bare `PORT`.
        for key in ["PORT", "SCRIBE_GATEWAY_PORT"] {
            if let Ok(v) = std::env::var(key) {
                if let Ok(port) = v.parse::<u16>() {
                    self.gateway.port = port;
                } else {
                    tracing::warn!("ignoring invalid {key} value: {v}");
                }
            }
        }
        if let Ok(v) = std::env::var("SCRIBE_GATEWAY_RATE_LIMIT")
            && let Ok(n) = v.parse::<u32>()
        {
            self.gateway.rate_limit = n;
        }
        if let Ok(v) = std::env::var("SCRIBE_GATEWAY_MAX_BODY_SIZE")
            && let Ok(n) = v.parse::<usize>()
        {
            self.gateway.max_body_size = n;
        }
    }
}
