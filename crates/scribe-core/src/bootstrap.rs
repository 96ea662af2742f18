//! Application bootstrap: config resolution, provider, index and chat service
//! construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;

use scribe_docs::{IndexHandle, IndexReport, Indexer, Retriever};
use scribe_llm::LlmProvider;
use scribe_llm::any::AnyProvider;
use scribe_llm::azure::AzureDeployment;
use scribe_llm::openai::OpenAiProvider;

use crate::chat::ChatService;
use crate::composer::Composer;
use crate::config::{Config, ProviderKind};
use crate::vault::EnvVaultProvider;

/// Priority: `--config` flag > `SCRIBE_CONFIG` env > `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("SCRIBE_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

/// Load, validate and resolve secrets from the environment.
///
/// # Errors
///
/// Returns an error if the file cannot be parsed or a setting is invalid.
pub async fn load_config(path: &Path) -> anyhow::Result<Config> {
    let mut config = Config::load(path)?;
    config.validate()?;
    config.resolve_secrets(&EnvVaultProvider).await?;
    tracing::debug!(path = %path.display(), provider = %config.llm.provider, "configuration loaded");
    Ok(config)
}

/// Build the configured chat and embedding provider.
///
/// A missing API key is logged; requests then fail upstream and surface as
/// model invocation errors.
///
/// # Errors
///
/// Returns an error if the azure provider is selected without its section.
pub fn create_provider(config: &Config) -> anyhow::Result<AnyProvider> {
    let api_key = match config.api_key() {
        Some(key) => key.expose().to_owned(),
        None => {
            tracing::warn!(provider = %config.llm.provider, "no API key configured");
            String::new()
        }
    };

    let provider = match config.llm.provider {
        ProviderKind::OpenAi => OpenAiProvider::new(
            api_key,
            config.llm.base_url.clone(),
            config.llm.model.clone(),
            config.llm.max_tokens,
            config.llm.embedding_model.clone(),
        ),
        ProviderKind::Azure => {
            let azure = config
                .llm
                .azure
                .as_ref()
                .context("llm.azure config section required for azure provider")?;
            let mut deployment = AzureDeployment::new(&azure.instance, &azure.deployment)
                .with_embedding_deployment(azure.embedding_deployment.clone())
                .with_api_version(&azure.api_version);
            if let Some(endpoint) = &azure.endpoint {
                deployment = deployment.with_endpoint(endpoint);
            }
            OpenAiProvider::azure(api_key, deployment, config.llm.max_tokens)
        }
    };

    Ok(AnyProvider::OpenAi(
        provider.with_temperature(config.llm.temperature),
    ))
}

/// Run the indexing pipeline once with the configured settings.
///
/// # Errors
///
/// Returns an error if the documents root is unusable or chunking settings
/// are invalid.
pub async fn build_index(
    config: &Config,
    provider: Arc<AnyProvider>,
) -> anyhow::Result<(Retriever, IndexReport)> {
    let indexer = Indexer::new(config.indexer_config(), provider);
    indexer
        .build()
        .await
        .with_context(|| format!("failed to index {}", config.documents.root.display()))
}

/// Build and install an index. On failure the handle is left untouched, the
/// error is logged, and the service keeps running without documents.
pub async fn init_index(
    config: &Config,
    provider: Arc<AnyProvider>,
    handle: &IndexHandle,
) -> Option<IndexReport> {
    match build_index(config, provider).await {
        Ok((retriever, report)) => {
            handle.install(retriever);
            Some(report)
        }
        Err(e) => {
            tracing::error!("failed to initialize document index: {e:#}");
            tracing::warn!("starting without document index");
            None
        }
    }
}

#[must_use]
pub fn build_chat_service(
    config: &Config,
    index: IndexHandle,
    provider: Arc<AnyProvider>,
) -> ChatService {
    ChatService::new(index, provider)
        .with_composer(Composer::new(config.prompt.system.clone()))
        .with_top_k(config.retrieval.top_k)
        .with_llm_timeout(config.timeouts.llm())
}

#[must_use]
pub fn build_shutdown() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::config::AzureConfig;
    use crate::vault::Secret;

    #[test]
    #[serial]
    fn config_path_priority() {
        unsafe { std::env::remove_var("SCRIBE_CONFIG") };
        assert_eq!(
            resolve_config_path(None),
            PathBuf::from("config/default.toml")
        );

        unsafe { std::env::set_var("SCRIBE_CONFIG", "/etc/scribe.toml") };
        assert_eq!(resolve_config_path(None), PathBuf::from("/etc/scribe.toml"));
        assert_eq!(
            resolve_config_path(Some(Path::new("cli.toml"))),
            PathBuf::from("cli.toml")
        );
        unsafe { std::env::remove_var("SCRIBE_CONFIG") };
    }

    #[test]
    fn creates_openai_provider() {
        let mut config = Config::default();
        config.secrets.openai_api_key = Some(Secret::new("sk-test"));
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "openai");
        assert!(provider.supports_embeddings());
    }

    #[test]
    fn creates_azure_provider() {
        let mut config = Config::default();
        config.llm.provider = ProviderKind::Azure;
        config.llm.azure = Some(AzureConfig {
            instance: "acme".into(),
            deployment: "chat".into(),
            ..AzureConfig::default()
        });
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "azure");
        assert!(!provider.supports_embeddings());
    }

    #[test]
    fn azure_without_section_fails() {
        let mut config = Config::default();
        config.llm.provider = ProviderKind::Azure;
        assert!(create_provider(&config).is_err());
    }

    #[tokio::test]
    async fn init_index_failure_leaves_handle_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.documents.root = dir.path().join("missing");

        let handle = IndexHandle::new();
        let provider = Arc::new(create_provider(&config).unwrap());
        assert!(init_index(&config, provider, &handle).await.is_none());
        assert!(handle.retriever().is_err());
    }

    #[tokio::test]
    async fn init_index_installs_built_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("faq.md"), "Passwords expire every ninety days.").unwrap();
        let mut config = Config::default();
        config.documents.root = dir.path().to_path_buf();
        config.documents.include_text = true;

        let handle = IndexHandle::new();
        let provider = Arc::new(create_provider(&config).unwrap());
        let report = init_index(&config, provider, &handle).await.unwrap();
        assert_eq!(report.chunks_created, 1);
        assert!(handle.is_ready());
    }
}
