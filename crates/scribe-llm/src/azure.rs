//! Azure OpenAI deployment addressing.
//!
//! Azure serves the OpenAI wire format under per-deployment URLs and
//! authenticates with an `api-key` header instead of a bearer token.

/// Default REST API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "2024-06-01";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureDeployment {
    /// Resource (instance) name: `https://{instance}.openai.azure.com`.
    pub instance: String,
    /// Chat completion deployment name.
    pub deployment: String,
    /// Embedding deployment name, if embeddings are served by this resource.
    pub embedding_deployment: Option<String>,
    pub api_version: String,
    /// Overrides the host derived from `instance` (proxies, tests).
    pub endpoint_override: Option<String>,
}

impl AzureDeployment {
    #[must_use]
    pub fn new(instance: impl Into<String>, deployment: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            deployment: deployment.into(),
            embedding_deployment: None,
            api_version: DEFAULT_API_VERSION.to_owned(),
            endpoint_override: None,
        }
    }

    #[must_use]
    pub fn with_embedding_deployment(mut self, deployment: Option<String>) -> Self {
        self.embedding_deployment = deployment;
        self
    }

    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let mut endpoint = endpoint.into();
        while endpoint.ends_with('/') {
            endpoint.pop();
        }
        self.endpoint_override = Some(endpoint);
        self
    }

    fn host(&self) -> String {
        self.endpoint_override
            .clone()
            .unwrap_or_else(|| format!("https://{}.openai.azure.com", self.instance))
    }

    #[must_use]
    pub fn chat_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.host(),
            self.deployment,
            self.api_version
        )
    }

    #[must_use]
    pub fn embeddings_url(&self) -> Option<String> {
        self.embedding_deployment.as_ref().map(|deployment| {
            format!(
                "{}/openai/deployments/{deployment}/embeddings?api-version={}",
                self.host(),
                self.api_version
            )
        })
    }
}
