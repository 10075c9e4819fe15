//! Search Throughput Library
//!
//! A load generator that measures how fast a remote document-indexing service
//! ingests documents and makes them searchable.
//!
//! # Overview
//!
//! - Workers: each worker owns a seeded content generator, builds batches of
//!   documents stamped with the run tag and posts them, retrying every failure
//!   after a fixed delay until the service accepts the batch
//! - Monitor: aggregates submitted counts and request latencies from all
//!   workers and turns them into periodic throughput reports
//! - Driver: creates the index, runs the pool until the target volume is
//!   submitted, then polls until the index has caught up
//!
//! ```text
//!  ┌──────────┐  post_batch      ┌──────────────┐
//!  │ Worker×N ├─────────────────►│              │
//!  └────┬─────┘                  │ IndexService │
//!       │ record_*               │  (HTTP or    │
//!  ┌────▼─────┐  count_matching  │  simulated)  │
//!  │ Monitor  ├─────────────────►│              │
//!  └────▲─────┘                  └──────────────┘
//!       │ tick
//!    Driver
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Load an index with the default settings
//! search-throughput run --endpoint https://example.search.windows.net --api-key ...
//!
//! # Try the pipeline without a service
//! search-throughput run --dry-run --target-documents 20000 --tick-interval 1s
//!
//! # Remove the index afterwards
//! search-throughput delete-index --endpoint ... --api-key ... --index throughput
//! ```

pub mod cli;
pub mod config;
pub mod driver;
pub mod monitor;
pub mod report;
pub mod retry;
pub mod simulated;
pub mod worker;

pub use config::{ConfigError, RunConfig};
pub use driver::run;
pub use monitor::{Monitor, MonitorPhase, Snapshot};
pub use report::{MetricsSink, ProgressReport, RunSummary};
pub use retry::RetryPolicy;
pub use simulated::SimulatedIndex;
pub use worker::{PoolSummary, WorkerConfig, WorkerError, WorkerPool};
