//! Scribe: answers questions about a directory of documents.
//!
//! ```bash
//! scribe serve                       # index ./docs and serve the chat API
//! scribe ask "How do I reset the VPN?"
//! scribe --config prod.toml index    # build the index and print the report
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use scribe_core::Config;
use scribe_core::bootstrap::{
    build_chat_service, build_index, build_shutdown, create_provider, init_index, load_config,
    resolve_config_path,
};
use scribe_docs::IndexHandle;
use scribe_gateway::GatewayServer;
use scribe_llm::any::AnyProvider;

#[derive(Parser)]
#[command(name = "scribe", version, about)]
struct Cli {
    /// Path to the TOML config (default: $SCRIBE_CONFIG or config/default.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index the documents directory and serve the HTTP chat API
    Serve,
    /// Answer a single question on stdout
    Ask {
        /// The question to answer
        question: String,
    },
    /// Build the index and print the report as JSON
    Index,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber();

    let config_path = resolve_config_path(cli.config.as_deref());
    let config = load_config(&config_path)
        .await
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let provider = Arc::new(create_provider(&config)?);

    match cli.command {
        Command::Serve => serve(config, provider).await,
        Command::Ask { question } => ask(&config, provider, &question).await,
        Command::Index => {
            let (_, report) = build_index(&config, provider).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn serve(config: Config, provider: Arc<AnyProvider>) -> anyhow::Result<()> {
    let index = IndexHandle::new();
    if let Some(report) = init_index(&config, Arc::clone(&provider), &index).await {
        tracing::info!(
            chunks = report.chunks_created,
            mode = %report.mode,
            degraded = report.degraded,
            "document index ready"
        );
    }

    let chat = build_chat_service(&config, index.clone(), Arc::clone(&provider));
    let (shutdown_tx, shutdown_rx) = build_shutdown();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e:#}");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    #[cfg(unix)]
    spawn_reindex_on_hangup(config.clone(), provider, index)?;

    GatewayServer::new(&config.gateway, chat, shutdown_rx).serve().await?;
    Ok(())
}

/// Rebuild off to the side on SIGHUP; the old index keeps serving until the
/// new one is installed, and stays in place if the rebuild fails.
#[cfg(unix)]
fn spawn_reindex_on_hangup(
    config: Config,
    provider: Arc<AnyProvider>,
    index: IndexHandle,
) -> anyhow::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup()).context("failed to install SIGHUP handler")?;
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            tracing::info!("SIGHUP received, rebuilding document index");
            match build_index(&config, Arc::clone(&provider)).await {
                Ok((retriever, report)) => {
                    index.install(retriever);
                    tracing::info!(
                        chunks = report.chunks_created,
                        fingerprint = %report.fingerprint,
                        "document index rebuilt"
                    );
                }
                Err(e) => tracing::error!("index rebuild failed, keeping previous index: {e:#}"),
            }
        }
    });
    Ok(())
}

async fn ask(config: &Config, provider: Arc<AnyProvider>, question: &str) -> anyhow::Result<()> {
    let index = IndexHandle::new();
    init_index(config, Arc::clone(&provider), &index).await;
    let chat = build_chat_service(config, index, provider);
    let answer = chat.answer(question).await?;
    println!("{answer}");
    Ok(())
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
