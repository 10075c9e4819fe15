//! Command-line interface for search-throughput
//!
//! # Usage Examples
//!
//! ```bash
//! # 4 workers posting 1000-document batches until 10000 documents are in
//! SEARCH_ENDPOINT=https://example.search.windows.net SEARCH_API_KEY=... \
//!   search-throughput run --index throughput
//!
//! # Larger run with a metrics file, deleting the index afterwards
//! search-throughput run --workers 16 --target-documents 1000000 \
//!   --metrics-output metrics.jsonl --delete-index-on-finish
//!
//! # Simulated service, no network
//! search-throughput run --dry-run --simulated-latency 20ms
//! ```

use anyhow::Context;
use clap::Parser;
use search_client::{IndexService, SearchClient};
use search_throughput::cli::{Cli, Commands};
use search_throughput::SimulatedIndex;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { connection, run } => {
            let config = run.to_config()?;
            let service: Arc<dyn IndexService> = if run.dry_run {
                let (latency, lag) = run.simulated_timing()?;
                tracing::info!(
                    "Dry run against a simulated service (latency {latency:?}, indexing lag {lag:?})"
                );
                Arc::new(
                    SimulatedIndex::new()
                        .with_request_latency(latency)
                        .with_indexing_lag(lag),
                )
            } else {
                let client_config = connection.to_client_config()?;
                tracing::info!(
                    "Connecting to {} (index {})",
                    client_config.endpoint,
                    client_config.index_name
                );
                Arc::new(SearchClient::new(client_config).context("Failed to create client")?)
            };

            search_throughput::run(&config, service).await?;
        }
        Commands::DeleteIndex { connection } => {
            let client = SearchClient::new(connection.to_client_config()?)
                .context("Failed to create client")?;
            client
                .delete_index()
                .await
                .with_context(|| format!("Failed to delete index {}", client.index_name()))?;
            tracing::info!("Index {} deleted", client.index_name());
        }
    }

    Ok(())
}
