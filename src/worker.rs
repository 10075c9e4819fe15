//! Worker pool that generates and posts batches until told to stop.

use crate::monitor::{Monitor, WorkerRegistration};
use crate::retry::{post_with_retry, RetryPolicy};
use content_generator::{
    seed_for_worker, GeneratorError, TextGenerator, DEFAULT_ALPHABET, DEFAULT_SEED,
};
use search_client::{Batch, Document, IndexService};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Per-worker batch and content settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub batch_size: usize,
    /// Target length of each document's content, in characters
    pub content_length: usize,
    pub average_word_length: usize,
    pub word_length_variation: usize,
    pub alphabet: String,
    /// Base seed; each worker derives its own from it
    pub seed: u64,
    pub retry: RetryPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            content_length: 10 * 1024,
            average_word_length: 10,
            word_length_variation: 2,
            alphabet: DEFAULT_ALPHABET.to_string(),
            seed: DEFAULT_SEED,
            retry: RetryPolicy::default(),
        }
    }
}

/// Errors that end a worker without restarting it.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("content generation failed: {0}")]
    Generation(#[from] GeneratorError),

    #[error("worker panicked: {0}")]
    Panicked(String),
}

/// Work done by one worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub batches: u64,
    pub documents: u64,
    /// Failed post attempts that were retried
    pub retries: u64,
}

/// One generator loop posting batches for a run.
pub struct Worker {
    index: usize,
    tag: String,
    config: WorkerConfig,
    generator: TextGenerator,
    service: Arc<dyn IndexService>,
    monitor: Arc<Monitor>,
    /// Shared with the pool so the counts survive a panicking task
    stats: Arc<Mutex<WorkerStats>>,
}

impl Worker {
    pub fn new(
        index: usize,
        tag: impl Into<String>,
        config: WorkerConfig,
        service: Arc<dyn IndexService>,
        monitor: Arc<Monitor>,
    ) -> Result<Self, WorkerError> {
        let generator =
            TextGenerator::with_alphabet(&config.alphabet, seed_for_worker(config.seed, index))?;
        Ok(Self {
            index,
            tag: tag.into(),
            config,
            generator,
            service,
            monitor,
            stats: Arc::new(Mutex::new(WorkerStats::default())),
        })
    }

    pub fn stats(&self) -> WorkerStats {
        *self.stats_mut()
    }

    fn stats_mut(&self) -> MutexGuard<'_, WorkerStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Generate one batch stamped with the run tag.
    pub fn build_batch(&mut self) -> Result<Batch, WorkerError> {
        let mut batch = Batch::with_capacity(self.config.batch_size);
        for _ in 0..self.config.batch_size {
            let content = self.generator.build_text(
                self.config.content_length,
                self.config.average_word_length,
                self.config.word_length_variation,
            )?;
            let id = self.generator.next_id();
            batch.push(Document::new(id, content, self.tag.as_str()));
        }
        Ok(batch)
    }

    /// Post `batch` until accepted, then report it to the monitor once.
    pub async fn submit_batch(&mut self, batch: &Batch) {
        let started = Instant::now();
        let failed_attempts =
            post_with_retry(self.service.as_ref(), batch, &self.config.retry, self.index).await;

        self.monitor.record_request(started.elapsed());
        self.monitor.record_submission(batch.len() as u64);

        let mut stats = self.stats_mut();
        stats.batches += 1;
        stats.documents += batch.len() as u64;
        stats.retries += u64::from(failed_attempts);
    }

    /// Loop until `stop` is cancelled. The signal is only checked between
    /// batches, so an in-flight batch is always finished first.
    ///
    /// Does not register with the monitor; [`WorkerPool::spawn`] does that
    /// before the task starts.
    pub async fn run(&mut self, stop: &CancellationToken) -> Result<(), WorkerError> {
        debug!("Worker {}: started", self.index);

        while !stop.is_cancelled() {
            let batch = self.build_batch()?;
            self.submit_batch(&batch).await;
        }

        debug!(
            "Worker {}: stopped after {} batches",
            self.index,
            self.stats().batches
        );
        Ok(())
    }
}

/// How one worker ended.
#[derive(Debug)]
pub struct WorkerOutcome {
    pub index: usize,
    pub stats: WorkerStats,
    pub error: Option<WorkerError>,
}

/// Totals over every worker of a pool.
#[derive(Debug, Default)]
pub struct PoolSummary {
    pub workers: Vec<WorkerOutcome>,
}

impl PoolSummary {
    pub fn batches(&self) -> u64 {
        self.workers.iter().map(|w| w.stats.batches).sum()
    }

    pub fn documents(&self) -> u64 {
        self.workers.iter().map(|w| w.stats.documents).sum()
    }

    pub fn retries(&self) -> u64 {
        self.workers.iter().map(|w| w.stats.retries).sum()
    }

    /// Workers that ended on an unexpected error.
    pub fn failed_workers(&self) -> usize {
        self.workers.iter().filter(|w| w.error.is_some()).count()
    }
}

struct WorkerHandle {
    index: usize,
    stats: Arc<Mutex<WorkerStats>>,
    task: JoinHandle<Result<(), WorkerError>>,
}

/// Fixed set of workers sharing one stop signal.
pub struct WorkerPool {
    stop: CancellationToken,
    handles: Vec<WorkerHandle>,
}

impl WorkerPool {
    /// Start `workers` workers, each on its own task.
    ///
    /// Every worker is built and registered with the monitor before the
    /// first task is spawned, so a failure starts nothing and the active
    /// count is complete as soon as this returns.
    pub fn spawn(
        workers: usize,
        config: &WorkerConfig,
        tag: &str,
        service: Arc<dyn IndexService>,
        monitor: Arc<Monitor>,
    ) -> Result<Self, WorkerError> {
        let built = (0..workers)
            .map(|index| {
                Worker::new(
                    index,
                    tag,
                    config.clone(),
                    Arc::clone(&service),
                    Arc::clone(&monitor),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let stop = CancellationToken::new();
        let mut handles = Vec::with_capacity(workers);

        for mut worker in built {
            let registration = WorkerRegistration::new(Arc::clone(&monitor));
            let index = worker.index;
            let stats = Arc::clone(&worker.stats);
            let stop = stop.clone();
            let task = tokio::spawn(async move {
                // Dropped with the task, also when it panics
                let _registration = registration;
                worker.run(&stop).await
            });
            handles.push(WorkerHandle { index, stats, task });
        }

        info!("Started {workers} workers for run {tag}");
        Ok(Self { stop, handles })
    }

    /// Signal every worker to stop after its current batch.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Wait for every worker to exit.
    ///
    /// Unexpected errors and panics are logged; the rest of the pool is
    /// unaffected by them.
    pub async fn join(self) -> PoolSummary {
        let mut summary = PoolSummary::default();

        for WorkerHandle { index, stats, task } in self.handles {
            let error = match task.await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => {
                    error!("Worker {index}: terminated: {e}");
                    Some(e)
                }
                Err(e) => {
                    error!("Worker {index}: task failed: {e}");
                    Some(WorkerError::Panicked(e.to_string()))
                }
            };
            let stats = *stats.lock().unwrap_or_else(PoisonError::into_inner);
            summary.workers.push(WorkerOutcome {
                index,
                stats,
                error,
            });
        }

        summary
    }
}
