//! Async storage trait for the durable metric store.
//!
//! The upsert engine and query service only ever talk to this trait. The
//! PostgreSQL implementation lives in the API crate; an in-memory one lives
//! in [`crate::memory`].

use ::async_trait::async_trait;
use psarchive_core::{MetricSample, StorageResult, StoredSample, TraceHop, UpsertCounts};

/// Durable store for metric rows and trace hops.
///
/// Every batch method applies its batch atomically: either the whole batch
/// is visible afterwards or none of it is.
#[async_trait]
pub trait MetricStore: Send + Sync {
    // ========================================================================
    // WRITES
    // ========================================================================

    /// Insert-or-update every sample on `(run_id, metric_name, ts)` in one
    /// transaction, counting fresh inserts vs. overwritten rows.
    async fn merge_samples(&self, samples: &[MetricSample]) -> StorageResult<UpsertCounts>;

    /// Insert samples whose key is absent, skipping the rest, and commit.
    /// Returns how many rows were actually inserted.
    async fn insert_samples_if_absent(&self, samples: &[MetricSample]) -> StorageResult<u64>;

    /// Replace trace hops keyed by `(run_id, hop_idx)` in one transaction.
    async fn upsert_trace_hops(&self, hops: &[TraceHop]) -> StorageResult<usize>;

    // ========================================================================
    // READS
    // ========================================================================

    /// All rows of a run, newest `ts` first.
    async fn fetch_run_samples(&self, run_id: &str) -> StorageResult<Vec<StoredSample>>;

    /// Trace hops of a run ordered by `hop_idx`.
    async fn trace_hops(&self, run_id: &str) -> StorageResult<Vec<TraceHop>>;

    /// Distinct `(metric_name, unit)` pairs ordered by name, then unit with
    /// null first, truncated to `limit` when given.
    async fn distinct_metric_units(
        &self,
        limit: Option<usize>,
    ) -> StorageResult<Vec<(String, Option<String>)>>;

    /// Cheap round trip proving the store is reachable.
    async fn ping(&self) -> StorageResult<()>;
}
