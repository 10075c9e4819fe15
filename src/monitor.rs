//! Progress monitor shared by the workers and the driver.
//!
//! Workers report every accepted batch through [`Monitor::record_submission`]
//! and [`Monitor::record_request`]. The driver calls [`Monitor::tick`] on its
//! own cadence; a tick that fires polls the service for the run's searchable
//! count, takes a [`Snapshot`] of the counters and emits one progress line.
//!
//! ```text
//!   Idle ──start()──► Accumulating ──begin_draining()──► Draining ──tick()──► Done
//!                                                          (searchable >= submitted)
//! ```

use crate::report::{MetricsSink, ProgressReport};
use search_client::{tag_filter, IndexService};
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Minimum time between two fired ticks unless configured otherwise.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Monitor lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MonitorPhase {
    /// Workers not started yet
    Idle = 0,
    /// Workers submitting batches
    Accumulating = 1,
    /// Workers stopped, waiting for the index to catch up
    Draining = 2,
    /// Searchable count reached the submitted count
    Done = 3,
}

impl MonitorPhase {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => MonitorPhase::Idle,
            1 => MonitorPhase::Accumulating,
            2 => MonitorPhase::Draining,
            _ => MonitorPhase::Done,
        }
    }
}

impl std::fmt::Display for MonitorPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorPhase::Idle => write!(f, "idle"),
            MonitorPhase::Accumulating => write!(f, "accumulating"),
            MonitorPhase::Draining => write!(f, "draining"),
            MonitorPhase::Done => write!(f, "done"),
        }
    }
}

/// Point-in-time copy of the monitor's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Documents accepted by the service
    pub submitted: u64,
    /// Time since the monitor was created
    pub elapsed: Duration,
    /// Searchable documents as last reported by the service
    pub searchable: u64,
    /// Successful batch requests
    pub request_count: u64,
    /// Sum of successful request latencies
    pub request_latency: Duration,
    /// Workers currently registered
    pub active_workers: usize,
}

/// Counters updated by the workers.
///
/// Kept behind one lock so a snapshot never sees a request counted without
/// its latency.
#[derive(Debug, Default)]
struct Tally {
    submitted: u64,
    request_count: u64,
    request_latency: Duration,
}

/// State owned by the tick path.
struct TickState {
    previous: Snapshot,
    sink: Option<MetricsSink>,
}

/// Documents per second between two snapshots.
///
/// `None` when the snapshots are not strictly time-ordered.
pub fn current_throughput(previous: &Snapshot, current: &Snapshot) -> Option<f64> {
    if current.elapsed <= previous.elapsed {
        return None;
    }
    let delta = current.submitted.saturating_sub(previous.submitted);
    Some(delta as f64 / (current.elapsed - previous.elapsed).as_secs_f64())
}

/// Documents per second since the start of the run.
pub fn average_throughput(submitted: u64, elapsed: Duration) -> Option<f64> {
    if elapsed.is_zero() {
        return None;
    }
    Some(submitted as f64 / elapsed.as_secs_f64())
}

/// Mean request latency; zero when no request completed yet.
pub fn average_latency(total: Duration, request_count: u64) -> Duration {
    if request_count == 0 {
        return Duration::ZERO;
    }
    let nanos = total.as_nanos() / u128::from(request_count);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Concurrency-safe progress aggregator for one run.
pub struct Monitor {
    filter: String,
    service: Arc<dyn IndexService>,
    started_at: Instant,
    report_interval: Duration,
    tally: Mutex<Tally>,
    active_workers: AtomicUsize,
    searchable: AtomicU64,
    phase: AtomicU8,
    tick_state: tokio::sync::Mutex<TickState>,
}

impl Monitor {
    /// Create a monitor for the documents tagged `tag`.
    pub fn new(tag: &str, service: Arc<dyn IndexService>, report_interval: Duration) -> Self {
        Self {
            filter: tag_filter(tag),
            service,
            started_at: Instant::now(),
            report_interval,
            tally: Mutex::new(Tally::default()),
            active_workers: AtomicUsize::new(0),
            searchable: AtomicU64::new(0),
            phase: AtomicU8::new(MonitorPhase::Idle as u8),
            tick_state: tokio::sync::Mutex::new(TickState {
                previous: Snapshot::default(),
                sink: None,
            }),
        }
    }

    /// Append every fired report to `sink`.
    pub fn with_metrics_sink(mut self, sink: MetricsSink) -> Self {
        self.tick_state.get_mut().sink = Some(sink);
        self
    }

    fn tally(&self) -> MutexGuard<'_, Tally> {
        self.tally.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `count` accepted documents.
    pub fn record_submission(&self, count: u64) {
        self.tally().submitted += count;
    }

    /// Add one successful request and its latency.
    pub fn record_request(&self, latency: Duration) {
        let mut tally = self.tally();
        tally.request_count += 1;
        tally.request_latency += latency;
    }

    /// Register a running worker.
    pub fn enter_worker(&self) {
        self.active_workers.fetch_add(1, Ordering::SeqCst);
    }

    /// Deregister a worker.
    pub fn exit_worker(&self) {
        // Saturate so an unbalanced exit cannot wrap the count
        let _ = self
            .active_workers
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn submitted_count(&self) -> u64 {
        self.tally().submitted
    }

    /// Searchable count from the most recent successful poll.
    pub fn searchable_count(&self) -> u64 {
        self.searchable.load(Ordering::SeqCst)
    }

    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> MonitorPhase {
        MonitorPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    pub fn is_done(&self) -> bool {
        self.phase() == MonitorPhase::Done
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Idle -> Accumulating.
    pub fn start(&self) {
        self.transition(MonitorPhase::Idle, MonitorPhase::Accumulating);
    }

    /// Idle or Accumulating -> Draining.
    pub fn begin_draining(&self) {
        if !self.transition(MonitorPhase::Accumulating, MonitorPhase::Draining) {
            self.transition(MonitorPhase::Idle, MonitorPhase::Draining);
        }
    }

    fn transition(&self, from: MonitorPhase, to: MonitorPhase) -> bool {
        self.phase
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Consistent copy of the counters, stamped with the current elapsed time.
    pub fn snapshot(&self) -> Snapshot {
        let tally = self.tally();
        Snapshot {
            submitted: tally.submitted,
            elapsed: self.started_at.elapsed(),
            searchable: self.searchable_count(),
            request_count: tally.request_count,
            request_latency: tally.request_latency,
            active_workers: self.active_workers(),
        }
    }

    /// Emit a progress report if a reporting interval has passed.
    ///
    /// Returns `None` without polling, rotating or printing when called
    /// again within the interval. A failed searchable-count poll is logged
    /// and also returns `None`, so the next call retries. While draining, a
    /// report whose searchable count reaches the submitted count moves the
    /// monitor to [`MonitorPhase::Done`].
    pub async fn tick(&self, show_throughput: bool) -> Option<ProgressReport> {
        let mut state = self.tick_state.lock().await;

        let since_previous = self.started_at.elapsed().saturating_sub(state.previous.elapsed);
        if since_previous < self.report_interval {
            return None;
        }

        let searchable = match self.service.count_matching(&self.filter).await {
            Ok(count) => count,
            Err(e) => {
                warn!("Failed to poll searchable count: {e}");
                return None;
            }
        };
        self.searchable.store(searchable, Ordering::SeqCst);

        let current = self.snapshot();
        let report = ProgressReport::new(&state.previous, &current, show_throughput);
        info!("{report}");

        if let Some(sink) = state.sink.as_mut() {
            if let Err(e) = sink.write(&report).await {
                warn!("Failed to write metrics: {e}");
            }
        }

        if self.phase() == MonitorPhase::Draining
            && current.searchable >= current.submitted
            && self.transition(MonitorPhase::Draining, MonitorPhase::Done)
        {
            info!(
                "Index caught up: {} of {} documents searchable",
                current.searchable, current.submitted
            );
        }

        state.previous = current;
        Some(report)
    }
}

/// Keeps a worker registered with the monitor for as long as it lives.
///
/// Deregistration happens on drop, so it also covers early returns and
/// panics inside the worker.
pub struct WorkerRegistration {
    monitor: Arc<Monitor>,
}

impl WorkerRegistration {
    pub fn new(monitor: Arc<Monitor>) -> Self {
        monitor.enter_worker();
        Self { monitor }
    }
}

impl Drop for WorkerRegistration {
    fn drop(&mut self) {
        self.monitor.exit_worker();
    }
}
