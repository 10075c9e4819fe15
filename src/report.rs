//! Progress lines, metrics file output and the end-of-run summary.

use crate::monitor::{average_latency, average_throughput, current_throughput, Snapshot};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// One fired monitor tick (one JSON line in the metrics file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub timestamp: String,
    pub elapsed_secs: f64,
    pub submitted: u64,
    /// Documents per second since the previous report
    pub current_throughput: Option<f64>,
    /// Documents per second since the start of the run
    pub average_throughput: Option<f64>,
    pub searchable: u64,
    pub average_latency_secs: f64,
    pub request_count: u64,
    pub active_workers: usize,
    /// Whether the console line includes the throughput figures
    #[serde(skip)]
    pub show_throughput: bool,
}

impl ProgressReport {
    pub fn new(previous: &Snapshot, current: &Snapshot, show_throughput: bool) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            elapsed_secs: current.elapsed.as_secs_f64(),
            submitted: current.submitted,
            current_throughput: current_throughput(previous, current),
            average_throughput: average_throughput(current.submitted, current.elapsed),
            searchable: current.searchable,
            average_latency_secs: average_latency(current.request_latency, current.request_count)
                .as_secs_f64(),
            request_count: current.request_count,
            active_workers: current.active_workers,
            show_throughput,
        }
    }
}

fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(r) => format!("{r:.2}"),
        None => "n/a".to_string(),
    }
}

/// `hh:mm:ss.fff`
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    let hours = millis / 3_600_000;
    let minutes = (millis / 60_000) % 60;
    let seconds = (millis / 1_000) % 60;
    let fraction = millis % 1_000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{fraction:03}")
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: Documents: {} ",
            format_elapsed(Duration::from_secs_f64(self.elapsed_secs)),
            self.submitted
        )?;
        if self.show_throughput {
            write!(
                f,
                "Current throughput: {} docs/s Avg. throughput: {} docs/s ",
                format_rate(self.current_throughput),
                format_rate(self.average_throughput)
            )?;
        }
        write!(
            f,
            "Searchable docs: {} Request latency: {:.3}s",
            self.searchable, self.average_latency_secs
        )
    }
}

/// Append-only JSONL writer for progress reports.
pub struct MetricsSink {
    path: PathBuf,
    file: tokio::fs::File,
}

impl MetricsSink {
    /// Open `path` for appending, creating it if needed.
    pub async fn open(path: &Path) -> Result<Self> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write(&mut self, report: &ProgressReport) -> Result<()> {
        let json_line = serde_json::to_string(report)?;
        self.file.write_all(json_line.as_bytes()).await?;
        self.file.write_all(b"\n").await?;
        self.file.flush().await?;
        Ok(())
    }
}

/// Outcome of a complete run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub tag: String,
    pub submitted: u64,
    pub searchable: u64,
    pub batches: u64,
    pub retries: u64,
    pub elapsed: Duration,
    /// Time from the stop signal until the index caught up
    pub drain_time: Duration,
    pub average_throughput: Option<f64>,
}

impl RunSummary {
    pub fn summary(&self) -> String {
        format!(
            "Run {}: {} documents in {} batches ({} retries), {} searchable, elapsed {}, drain {}, avg. throughput {} docs/s",
            self.tag,
            self.submitted,
            self.batches,
            self.retries,
            self.searchable,
            format_elapsed(self.elapsed),
            format_elapsed(self.drain_time),
            format_rate(self.average_throughput)
        )
    }
}
