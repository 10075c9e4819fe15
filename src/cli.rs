//! Command-line arguments.

use crate::config::{parse_duration, RunConfig};
use crate::retry::RetryPolicy;
use crate::worker::WorkerConfig;
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use content_generator::{DEFAULT_ALPHABET, DEFAULT_SEED};
use search_client::{ClientConfig, IndexSchema, DEFAULT_API_VERSION};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "search-throughput")]
#[command(about = "Measure indexing throughput of a remote search service")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load the index until the target is reached and wait for it to catch up
    Run {
        #[command(flatten)]
        connection: ConnectionArgs,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Delete the index
    DeleteIndex {
        #[command(flatten)]
        connection: ConnectionArgs,
    },
}

/// Service connection options.
#[derive(Args, Clone, Debug)]
pub struct ConnectionArgs {
    /// Service endpoint URL
    #[arg(long, env = "SEARCH_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Admin API key
    #[arg(long, env = "SEARCH_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Index to load
    #[arg(long, default_value = "throughput", env = "SEARCH_INDEX")]
    pub index: String,

    /// Value of the api-version query parameter
    #[arg(long, default_value = DEFAULT_API_VERSION)]
    pub api_version: String,

    /// Per-request timeout (e.g. "30s", "500ms")
    #[arg(long, default_value = "30s")]
    pub request_timeout: String,
}

impl ConnectionArgs {
    pub fn to_client_config(&self) -> anyhow::Result<ClientConfig> {
        let endpoint = self
            .endpoint
            .clone()
            .context("--endpoint (or SEARCH_ENDPOINT) is required")?;
        let api_key = self
            .api_key
            .clone()
            .context("--api-key (or SEARCH_API_KEY) is required")?;

        let mut config = ClientConfig::new(endpoint, api_key, self.index.as_str());
        config.api_version = self.api_version.clone();
        config.timeout = parse_duration(&self.request_timeout)
            .context("Invalid --request-timeout")?;
        Ok(config)
    }
}

/// Load generation options.
#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Stop submitting once this many documents were accepted
    #[arg(long, default_value = "10000")]
    pub target_documents: u64,

    /// Number of concurrent workers
    #[arg(long, default_value = "4")]
    pub workers: usize,

    /// Documents per batch
    #[arg(long, default_value = "1000")]
    pub batch_size: usize,

    /// Length of each document's content in characters
    #[arg(long, default_value = "10240")]
    pub content_length: usize,

    /// Average generated word length
    #[arg(long, default_value = "10")]
    pub average_word_length: usize,

    /// Maximum deviation from the average word length
    #[arg(long, default_value = "2")]
    pub word_length_variation: usize,

    /// Characters words are built from
    #[arg(long, default_value = DEFAULT_ALPHABET)]
    pub alphabet: String,

    /// Base random seed; workers derive their own from it
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Delay between attempts to post a failed batch
    #[arg(long, default_value = "500ms")]
    pub retry_delay: String,

    /// How often progress is checked
    #[arg(long, default_value = "10s")]
    pub tick_interval: String,

    /// Minimum time between two progress reports
    #[arg(long, default_value = "1s")]
    pub report_interval: String,

    /// YAML file overriding the index schema
    #[arg(long, value_name = "PATH")]
    pub schema: Option<PathBuf>,

    /// Append every progress report as a JSON line to this file
    #[arg(long, value_name = "PATH")]
    pub metrics_output: Option<PathBuf>,

    /// Run tag stamped on every document (default: random)
    #[arg(long)]
    pub tag: Option<String>,

    /// Use an existing index instead of creating it
    #[arg(long)]
    pub skip_create_index: bool,

    /// Delete the index once the run is complete
    #[arg(long)]
    pub delete_index_on_finish: bool,

    /// Run against an in-process simulated service
    #[arg(long)]
    pub dry_run: bool,

    /// Request latency of the simulated service
    #[arg(long, default_value = "50ms")]
    pub simulated_latency: String,

    /// Time until the simulated service makes a batch searchable
    #[arg(long, default_value = "2s")]
    pub simulated_indexing_lag: String,
}

impl RunArgs {
    pub fn to_config(&self) -> anyhow::Result<RunConfig> {
        let schema = match &self.schema {
            Some(path) => IndexSchema::from_file(path)
                .with_context(|| format!("Failed to load schema from {path:?}"))?,
            None => IndexSchema::default(),
        };

        Ok(RunConfig {
            target_documents: self.target_documents,
            workers: self.workers,
            worker: WorkerConfig {
                batch_size: self.batch_size,
                content_length: self.content_length,
                average_word_length: self.average_word_length,
                word_length_variation: self.word_length_variation,
                alphabet: self.alphabet.clone(),
                seed: self.seed,
                retry: RetryPolicy::constant(
                    parse_duration(&self.retry_delay).context("Invalid --retry-delay")?,
                ),
            },
            tick_interval: parse_duration(&self.tick_interval)
                .context("Invalid --tick-interval")?,
            report_interval: parse_duration(&self.report_interval)
                .context("Invalid --report-interval")?,
            schema,
            metrics_output: self.metrics_output.clone(),
            tag: self.tag.clone(),
            skip_create_index: self.skip_create_index,
            delete_index_on_finish: self.delete_index_on_finish,
        })
    }

    /// Latency and indexing lag of the simulated service.
    pub fn simulated_timing(&self) -> anyhow::Result<(Duration, Duration)> {
        let latency =
            parse_duration(&self.simulated_latency).context("Invalid --simulated-latency")?;
        let lag = parse_duration(&self.simulated_indexing_lag)
            .context("Invalid --simulated-indexing-lag")?;
        Ok((latency, lag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("search-throughput").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_run_defaults() {
        let cli = parse(&["run", "--endpoint", "http://localhost:1", "--api-key", "k"]);
        let Commands::Run { connection, run } = cli.command else {
            panic!("expected run command");
        };

        let config = run.to_config().unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.target_documents, 10_000);
        assert_eq!(config.worker.batch_size, 1000);
        assert_eq!(config.worker.seed, 15);
        assert_eq!(config.worker.retry.delay(), Duration::from_millis(500));
        assert_eq!(config.tick_interval, Duration::from_secs(10));
        assert_eq!(config.report_interval, Duration::from_secs(1));
        assert!(!run.dry_run);
        config.validate().unwrap();

        let client = connection.to_client_config().unwrap();
        assert_eq!(client.index_name, "throughput");
        assert_eq!(client.api_version, DEFAULT_API_VERSION);
        assert_eq!(client.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_run_overrides() {
        let cli = parse(&[
            "run",
            "--dry-run",
            "--workers",
            "8",
            "--batch-size",
            "50",
            "--tick-interval",
            "250ms",
            "--retry-delay",
            "2s",
            "--tag",
            "bench",
        ]);
        let Commands::Run { run, .. } = cli.command else {
            panic!("expected run command");
        };

        let config = run.to_config().unwrap();
        assert!(run.dry_run);
        assert_eq!(config.workers, 8);
        assert_eq!(config.worker.batch_size, 50);
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.worker.retry.delay(), Duration::from_secs(2));
        assert_eq!(config.tag.as_deref(), Some("bench"));
        assert_eq!(
            run.simulated_timing().unwrap(),
            (Duration::from_millis(50), Duration::from_secs(2))
        );
    }

    #[test]
    fn test_missing_credentials() {
        let cli = parse(&["delete-index", "--index", "other"]);
        let Commands::DeleteIndex { connection } = cli.command else {
            panic!("expected delete-index command");
        };
        // Set through the environment in some shells; only assert when absent
        if connection.endpoint.is_none() {
            let err = connection.to_client_config().unwrap_err();
            assert!(err.to_string().contains("--endpoint"));
        }
        assert_eq!(connection.index, "other");
    }

    #[test]
    fn test_invalid_duration_reported() {
        let cli = parse(&["run", "--report-interval", "soon"]);
        let Commands::Run { run, .. } = cli.command else {
            panic!("expected run command");
        };
        let err = run.to_config().unwrap_err();
        assert!(format!("{err:#}").contains("--report-interval"));
    }

    #[test]
    fn test_schema_file_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "fields:\n  - {{ name: id, type: Edm.String, key: true }}\n  - {{ name: content, type: Edm.String }}\n  - {{ name: tag, type: Edm.String, filterable: true }}"
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let cli = parse(&["run", "--schema", &path]);
        let Commands::Run { run, .. } = cli.command else {
            panic!("expected run command");
        };

        let config = run.to_config().unwrap();
        assert_eq!(config.schema.fields.len(), 3);
        assert_eq!(config.schema.fields[2].filterable, Some(true));
    }
}
