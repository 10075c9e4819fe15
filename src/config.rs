//! Run configuration and validation.

pub mod duration;

pub use duration::parse_duration;

use crate::monitor::DEFAULT_REPORT_INTERVAL;
use crate::worker::WorkerConfig;
use content_generator::{validate_word_length, GeneratorError, TextGenerator};
use search_client::{IndexSchema, SchemaError};
use std::path::PathBuf;
use std::time::Duration;

/// Driver tick cadence when none is configured.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(10);

/// Invalid run settings, reported before anything is started.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("invalid content settings: {0}")]
    Content(#[from] GeneratorError),

    #[error("invalid index schema: {0}")]
    Schema(#[from] SchemaError),
}

/// Everything one run needs besides the service connection.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Stop submitting once this many documents were accepted
    pub target_documents: u64,
    pub workers: usize,
    pub worker: WorkerConfig,
    /// How often the driver calls the monitor
    pub tick_interval: Duration,
    /// Minimum time between two reports
    pub report_interval: Duration,
    pub schema: IndexSchema,
    /// JSONL file receiving every progress report
    pub metrics_output: Option<PathBuf>,
    /// Run tag; a fresh one is generated when unset
    pub tag: Option<String>,
    pub skip_create_index: bool,
    pub delete_index_on_finish: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            target_documents: 10_000,
            workers: 4,
            worker: WorkerConfig::default(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            report_interval: DEFAULT_REPORT_INTERVAL,
            schema: IndexSchema::default(),
            metrics_output: None,
            tag: None,
            skip_create_index: false,
            delete_index_on_finish: false,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_documents == 0 {
            return Err(ConfigError::Zero("target documents"));
        }
        if self.workers == 0 {
            return Err(ConfigError::Zero("worker count"));
        }
        if self.worker.batch_size == 0 {
            return Err(ConfigError::Zero("batch size"));
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::Zero("tick interval"));
        }
        if self.report_interval.is_zero() {
            return Err(ConfigError::Zero("report interval"));
        }

        validate_word_length(
            self.worker.average_word_length,
            self.worker.word_length_variation,
        )?;
        TextGenerator::with_alphabet(&self.worker.alphabet, self.worker.seed)?;

        self.schema.validate()?;
        Ok(())
    }
}
