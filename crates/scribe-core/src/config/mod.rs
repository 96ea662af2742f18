mod env;
mod types;


pub use types::*;

use std::path::Path;

use anyhow::{Context, bail};

use crate::vault::{Secret, VaultProvider, first_secret};

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.normalize();
        Ok(config)
    }

    fn normalize(&mut self) {
        if self
            .llm
            .embedding_model
            .as_deref()
            .is_some_and(|m| m.trim().is_empty())
        {
            self.llm.embedding_model = None;
        }
        if let Some(azure) = self.llm.azure.as_mut()
            && azure
                .embedding_deployment
                .as_deref()
                .is_some_and(|d| d.trim().is_empty())
        {
            azure.embedding_deployment = None;
        }
    }

    /// Reject settings the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.chunking.chunk_size == 0 {
            bail!("chunking.chunk_size must be greater than zero");
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            bail!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap,
                self.chunking.chunk_size
            );
        }
        if self.retrieval.top_k == 0 {
            bail!("retrieval.top_k must be a positive integer");
        }
        if self.timeouts.llm_seconds == 0 {
            bail!("timeouts.llm_seconds must be greater than zero");
        }
        if self.timeouts.embedding_seconds == 0 {
            bail!("timeouts.embedding_seconds must be greater than zero");
        }
        if self.retrieval.embed_batch_size == 0 {
            bail!("retrieval.embed_batch_size must be greater than zero");
        }
        if self.llm.provider == ProviderKind::Azure {
            let azure = self
                .llm
                .azure
                .as_ref()
                .context("llm.azure section required for azure provider")?;
            if azure.instance.trim().is_empty() && azure.endpoint.is_none() {
                bail!("llm.azure.instance is required for azure provider");
            }
            if azure.deployment.trim().is_empty() {
                bail!("llm.azure.deployment is required for azure provider");
            }
        }
        Ok(())
    }

    /// Resolve API keys through the vault.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault backend fails.
    pub async fn resolve_secrets(&mut self, vault: &dyn VaultProvider) -> anyhow::Result<()> {
        self.secrets.openai_api_key = first_secret(vault, &["SCRIBE_OPENAI_API_KEY"]).await?;
        self.secrets.azure_api_key =
            first_secret(vault, &["SCRIBE_AZURE_API_KEY", "AZURE_OPENAI_API_KEY"]).await?;
        Ok(())
    }

    /// The API key for the configured provider, if resolved.
    #[must_use]
    pub fn api_key(&self) -> Option<&Secret> {
        match self.llm.provider {
            ProviderKind::OpenAi => self.secrets.openai_api_key.as_ref(),
            ProviderKind::Azure => self.secrets.azure_api_key.as_ref(),
        }
    }
}
