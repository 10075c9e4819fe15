//! In-process stand-in for the indexing service.
//!
//! `SimulatedIndex` accepts batches after a configurable request latency and
//! makes them searchable once a configurable indexing lag has passed. It backs
//! `--dry-run` and the tests; failures can be injected per call.

use async_trait::async_trait;
use search_client::{Batch, IndexSchema, IndexService, ServiceError, ServiceOperation};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Documents accepted by one successful post, per tag.
struct AcceptedBatch {
    at: Instant,
    per_tag: BTreeMap<String, u64>,
}

#[derive(Default)]
struct SimulatedState {
    index_created: bool,
    index_deleted: bool,
    reject_index_operations: bool,
    pending_post_failures: u32,
    post_attempts: u64,
    count_queries: u64,
    accepted: Vec<AcceptedBatch>,
}

/// Simulated indexing service with request latency and indexing lag.
#[derive(Default)]
pub struct SimulatedIndex {
    request_latency: Duration,
    indexing_lag: Duration,
    state: Mutex<SimulatedState>,
}

impl SimulatedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` before it completes.
    pub fn with_request_latency(mut self, latency: Duration) -> Self {
        self.request_latency = latency;
        self
    }

    /// Documents become searchable `lag` after their batch was accepted.
    pub fn with_indexing_lag(mut self, lag: Duration) -> Self {
        self.indexing_lag = lag;
        self
    }

    /// Fail the next `count` batch posts with a throttling status.
    pub fn fail_next_posts(&self, count: u32) {
        self.state().pending_post_failures += count;
    }

    /// Fail every create/delete index call.
    pub fn reject_index_operations(&self) {
        self.state().reject_index_operations = true;
    }

    pub fn index_created(&self) -> bool {
        self.state().index_created
    }

    pub fn index_deleted(&self) -> bool {
        self.state().index_deleted
    }

    /// Post attempts, failed ones included.
    pub fn post_attempts(&self) -> u64 {
        self.state().post_attempts
    }

    pub fn accepted_batches(&self) -> usize {
        self.state().accepted.len()
    }

    /// Documents accepted so far, searchable or not.
    pub fn accepted_documents(&self) -> u64 {
        self.state()
            .accepted
            .iter()
            .flat_map(|batch| batch.per_tag.values())
            .sum()
    }

    pub fn count_queries(&self) -> u64 {
        self.state().count_queries
    }

    fn state(&self) -> MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn simulate_latency(&self) {
        if !self.request_latency.is_zero() {
            tokio::time::sleep(self.request_latency).await;
        }
    }
}

fn throttled(operation: ServiceOperation) -> ServiceError {
    ServiceError::Status {
        operation,
        status: 503,
        body: "simulated throttling".to_string(),
    }
}

#[async_trait]
impl IndexService for SimulatedIndex {
    async fn create_index(&self, schema: &IndexSchema) -> Result<(), ServiceError> {
        self.simulate_latency().await;
        schema.validate().map_err(|e| ServiceError::Status {
            operation: ServiceOperation::CreateIndex,
            status: 400,
            body: e.to_string(),
        })?;

        let mut state = self.state();
        if state.reject_index_operations {
            return Err(ServiceError::Status {
                operation: ServiceOperation::CreateIndex,
                status: 403,
                body: "simulated rejection".to_string(),
            });
        }
        state.index_created = true;
        Ok(())
    }

    async fn delete_index(&self) -> Result<(), ServiceError> {
        self.simulate_latency().await;

        let mut state = self.state();
        if state.reject_index_operations {
            return Err(ServiceError::Status {
                operation: ServiceOperation::DeleteIndex,
                status: 403,
                body: "simulated rejection".to_string(),
            });
        }
        state.index_deleted = true;
        state.accepted.clear();
        Ok(())
    }

    async fn post_batch(&self, batch: &Batch) -> Result<(), ServiceError> {
        self.simulate_latency().await;

        let mut state = self.state();
        state.post_attempts += 1;
        if state.pending_post_failures > 0 {
            state.pending_post_failures -= 1;
            return Err(throttled(ServiceOperation::PostBatch));
        }

        let mut per_tag = BTreeMap::new();
        for document in batch.documents() {
            *per_tag.entry(document.tag.clone()).or_insert(0) += 1;
        }
        state.accepted.push(AcceptedBatch {
            at: Instant::now(),
            per_tag,
        });
        Ok(())
    }

    async fn count_matching(&self, filter: &str) -> Result<u64, ServiceError> {
        self.simulate_latency().await;

        let tag = filter.strip_prefix("tag:");
        let now = Instant::now();
        let mut state = self.state();
        state.count_queries += 1;

        let count = state
            .accepted
            .iter()
            .filter(|batch| batch.at + self.indexing_lag <= now)
            .flat_map(|batch| batch.per_tag.iter())
            .filter(|(batch_tag, _)| tag.map_or(true, |t| t == batch_tag.as_str()))
            .map(|(_, n)| *n)
            .sum();
        Ok(count)
    }
}

/// Wraps a [`SimulatedIndex`] and panics on every post once `accepted`
/// posts went through.
#[cfg(test)]
pub(crate) struct PanicAfterPosts {
    inner: SimulatedIndex,
    accepted: u64,
}

#[cfg(test)]
impl PanicAfterPosts {
    pub(crate) fn new(inner: SimulatedIndex, accepted: u64) -> Self {
        Self { inner, accepted }
    }

    pub(crate) fn inner(&self) -> &SimulatedIndex {
        &self.inner
    }
}

#[cfg(test)]
#[async_trait]
impl IndexService for PanicAfterPosts {
    async fn create_index(&self, schema: &IndexSchema) -> Result<(), ServiceError> {
        self.inner.create_index(schema).await
    }

    async fn delete_index(&self) -> Result<(), ServiceError> {
        self.inner.delete_index().await
    }

    async fn post_batch(&self, batch: &Batch) -> Result<(), ServiceError> {
        if self.inner.post_attempts() >= self.accepted {
            panic!("connection state corrupted");
        }
        self.inner.post_batch(batch).await
    }

    async fn count_matching(&self, filter: &str) -> Result<u64, ServiceError> {
        self.inner.count_matching(filter).await
    }
}
