use std::fmt;

use serde::{Deserialize, Serialize};

use crate::azure::AzureDeployment;
use crate::error::LlmError;
use crate::provider::{LlmProvider, Message};
use crate::retry::send_with_retry;

const DEFAULT_MAX_RETRIES: u32 = 2;

#[derive(Clone)]
enum Endpoint {
    OpenAi { base_url: String },
    Azure(AzureDeployment),
}

/// Chat and embedding client for the OpenAI wire format, served either by
/// `api.openai.com`-style endpoints or by an Azure OpenAI deployment.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: Endpoint,
    model: String,
    max_tokens: u32,
    temperature: f32,
    embedding_model: Option<String>,
    max_retries: u32,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let endpoint = match &self.endpoint {
            Endpoint::OpenAi { base_url } => base_url.clone(),
            Endpoint::Azure(d) => d.chat_url(),
        };
        f.debug_struct("OpenAiProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("endpoint", &endpoint)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("embedding_model", &self.embedding_model)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(
        api_key: String,
        mut base_url: String,
        model: String,
        max_tokens: u32,
        embedding_model: Option<String>,
    ) -> Self {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: crate::http::default_client(),
            api_key,
            endpoint: Endpoint::OpenAi { base_url },
            model,
            max_tokens,
            temperature: 0.0,
            embedding_model,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Build a provider that talks to an Azure OpenAI deployment.
    ///
    /// The deployment name doubles as the model label in logs; Azure ignores the
    /// `model` request field.
    #[must_use]
    pub fn azure(api_key: String, deployment: AzureDeployment, max_tokens: u32) -> Self {
        Self {
            client: crate::http::default_client(),
            api_key,
            model: deployment.deployment.clone(),
            embedding_model: deployment.embedding_deployment.clone(),
            endpoint: Endpoint::Azure(deployment),
            max_tokens,
            temperature: 0.0,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn provider_name(&self) -> &'static str {
        match self.endpoint {
            Endpoint::OpenAi { .. } => "openai",
            Endpoint::Azure(_) => "azure",
        }
    }

    fn chat_url(&self) -> String {
        match &self.endpoint {
            Endpoint::OpenAi { base_url } => format!("{base_url}/chat/completions"),
            Endpoint::Azure(d) => d.chat_url(),
        }
    }

    fn embeddings_url(&self) -> Option<String> {
        match &self.endpoint {
            Endpoint::OpenAi { base_url } => self
                .embedding_model
                .as_ref()
                .map(|_| format!("{base_url}/embeddings")),
            Endpoint::Azure(d) => d.embeddings_url(),
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.endpoint {
            Endpoint::OpenAi { .. } => {
                request.header("Authorization", format!("Bearer {}", self.api_key))
            }
            Endpoint::Azure(_) => request.header("api-key", &self.api_key),
        }
    }

    async fn post_json<B: Serialize + Sync>(&self, url: &str, body: &B) -> Result<String, LlmError> {
        let provider = self.provider_name();
        let response = send_with_retry(provider, self.max_retries, || {
            self.authorize(self.client.post(url))
                .header("Content-Type", "application/json")
                .json(body)
                .send()
        })
        .await?;

        let status = response.status();
        let text = response.text().await.map_err(LlmError::Http)?;

        if !status.is_success() {
            tracing::error!(provider, %status, body = %text, "API request failed");
            return Err(LlmError::Api {
                provider,
                status: status.as_u16(),
            });
        }

        Ok(text)
    }
}

impl LlmProvider for OpenAiProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let api_messages = convert_messages(messages);
        let body = ChatRequest {
            model: &self.model,
            messages: &api_messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let text = self.post_json(&self.chat_url(), &body).await?;
        let resp: ChatCompletionResponse = serde_json::from_str(&text)?;

        if let Some(usage) = resp.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion usage"
            );
        }

        resp.choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or(LlmError::EmptyResponse {
                provider: self.provider_name(),
            })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let mut vectors = self.embed_batch(&[text.to_owned()]).await?;
        vectors.pop().ok_or(LlmError::EmptyResponse {
            provider: self.provider_name(),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let Some(url) = self.embeddings_url() else {
            return Err(LlmError::EmbedUnsupported {
                provider: self.provider_name(),
            });
        };
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingRequest {
            input: texts,
            model: self.embedding_model.as_deref().unwrap_or_default(),
        };

        let text = self.post_json(&url, &body).await?;
        let mut resp: EmbeddingResponse = serde_json::from_str(&text)?;

        if resp.data.len() != texts.len() {
            return Err(LlmError::EmbedCountMismatch {
                expected: texts.len(),
                actual: resp.data.len(),
            });
        }
        resp.data.sort_by_key(|d| d.index);
        Ok(resp.data.into_iter().map(|d| d.embedding).collect())
    }

    fn supports_embeddings(&self) -> bool {
        self.embeddings_url().is_some()
    }

    fn name(&self) -> &str {
        self.provider_name()
    }
}

fn convert_messages(messages: &[Message]) -> Vec<ApiMessage<'_>> {
    messages
        .iter()
        .map(|msg| ApiMessage {
            role: msg.role.as_str(),
            content: &msg.content,
        })
        .collect()
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ApiMessage<'a>],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}
