//! Run driver: create the index, load it until the target is reached, then
//! wait until every submitted document is searchable.

use crate::config::RunConfig;
use crate::monitor::{average_throughput, Monitor};
use crate::report::{MetricsSink, RunSummary};
use crate::worker::WorkerPool;
use anyhow::Context;
use search_client::IndexService;
use std::sync::Arc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Generate a run tag that no earlier run has used.
pub fn new_run_tag() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Execute one complete run against `service`.
///
/// Only setup failures are returned as errors: invalid settings, a failed
/// index creation or deletion, an unopenable metrics file, or a pool in
/// which every worker terminated before the target was reached.
pub async fn run(
    config: &RunConfig,
    service: Arc<dyn IndexService>,
) -> anyhow::Result<RunSummary> {
    config.validate().context("Invalid run configuration")?;

    if config.skip_create_index {
        info!("Skipping index creation");
    } else {
        service
            .create_index(&config.schema)
            .await
            .context("Failed to create index")?;
        info!("Index created");
    }

    let tag = config.tag.clone().unwrap_or_else(new_run_tag);
    let mut monitor = Monitor::new(&tag, Arc::clone(&service), config.report_interval);
    if let Some(path) = &config.metrics_output {
        let sink = MetricsSink::open(path)
            .await
            .with_context(|| format!("Failed to open metrics output {path:?}"))?;
        monitor = monitor.with_metrics_sink(sink);
    }
    let monitor = Arc::new(monitor);

    info!(
        "Starting run {tag}: {} workers, batch size {}, target {} documents",
        config.workers, config.worker.batch_size, config.target_documents
    );
    monitor.start();
    let pool = WorkerPool::spawn(
        config.workers,
        &config.worker,
        &tag,
        Arc::clone(&service),
        Arc::clone(&monitor),
    )
    .context("Failed to start workers")?;

    let mut ticker = tokio::time::interval(config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        monitor.tick(true).await;
        if monitor.submitted_count() >= config.target_documents {
            break;
        }
        if monitor.active_workers() == 0 {
            pool.stop();
            let summary = pool.join().await;
            anyhow::bail!(
                "All {} workers terminated after {} of {} documents",
                summary.workers.len(),
                summary.documents(),
                config.target_documents
            );
        }
    }

    info!(
        "Target of {} documents reached, stopping workers",
        config.target_documents
    );
    pool.stop();
    let pool_summary = pool.join().await;
    if pool_summary.failed_workers() > 0 {
        warn!(
            "{} of {} workers terminated early",
            pool_summary.failed_workers(),
            pool_summary.workers.len()
        );
    }

    monitor.begin_draining();
    let drain_started = Instant::now();
    info!(
        "Waiting for {} documents to become searchable",
        monitor.submitted_count()
    );
    while !monitor.is_done() {
        ticker.tick().await;
        monitor.tick(false).await;
    }
    let drain_time = drain_started.elapsed();

    if config.delete_index_on_finish {
        service
            .delete_index()
            .await
            .context("Failed to delete index")?;
        info!("Index deleted");
    }

    let elapsed = monitor.elapsed();
    let submitted = monitor.submitted_count();
    let summary = RunSummary {
        tag,
        submitted,
        searchable: monitor.searchable_count(),
        batches: pool_summary.batches(),
        retries: pool_summary.retries(),
        elapsed,
        drain_time,
        average_throughput: average_throughput(submitted, elapsed),
    };
    info!("{}", summary.summary());
    Ok(summary)
}
