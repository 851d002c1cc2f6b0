//! In-memory `MetricStore` for tests and local development.

use crate::store::MetricStore;
use ::async_trait::async_trait;
use psarchive_core::{
    MetricSample, StorageError, StorageResult, StoredSample, Timestamp, TraceHop, UpsertCounts,
};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, RwLock};

type SampleKey = (String, String, Timestamp);
type HopKey = (String, i32);

#[derive(Debug, Default)]
struct Tables {
    samples: BTreeMap<SampleKey, MetricSample>,
    hops: BTreeMap<HopKey, TraceHop>,
}

/// Faults injected into the store, for exercising error paths.
#[derive(Debug, Default)]
struct Faults {
    offline: bool,
    failing_runs: HashSet<String>,
}

/// Mock store backed by ordered maps.
///
/// Each batch runs under a single write lock, so it is applied atomically
/// with respect to concurrent callers. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetricStore {
    tables: Arc<RwLock<Tables>>,
    faults: Arc<RwLock<Faults>>,
}

impl InMemoryMetricStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored metric rows.
    pub fn sample_count(&self) -> usize {
        self.tables.read().map(|t| t.samples.len()).unwrap_or(0)
    }

    /// Number of stored trace hops.
    pub fn hop_count(&self) -> usize {
        self.tables.read().map(|t| t.hops.len()).unwrap_or(0)
    }

    /// Snapshot of every stored row in key order.
    pub fn samples(&self) -> Vec<MetricSample> {
        self.tables
            .read()
            .map(|t| t.samples.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop all rows and hops.
    pub fn clear(&self) {
        if let Ok(mut tables) = self.tables.write() {
            *tables = Tables::default();
        }
    }

    /// When offline, every call fails with a pool error.
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut faults) = self.faults.write() {
            faults.offline = offline;
        }
    }

    /// Make every write touching `run_id` fail with a query error.
    pub fn fail_writes_for(&self, run_id: impl Into<String>) {
        if let Ok(mut faults) = self.faults.write() {
            faults.failing_runs.insert(run_id.into());
        }
    }

    fn check_available(&self) -> StorageResult<()> {
        let faults = self.faults.read().map_err(|_| StorageError::LockPoisoned)?;
        if faults.offline {
            return Err(StorageError::Pool {
                reason: "store is offline".to_string(),
            });
        }
        Ok(())
    }

    fn check_writable<'a>(&self, mut run_ids: impl Iterator<Item = &'a str>) -> StorageResult<()> {
        self.check_available()?;
        let faults = self.faults.read().map_err(|_| StorageError::LockPoisoned)?;
        match run_ids.find(|id| faults.failing_runs.contains(*id)) {
            Some(id) => Err(StorageError::Query {
                reason: format!("injected write failure for run_id={id}"),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MetricStore for InMemoryMetricStore {
    async fn merge_samples(&self, samples: &[MetricSample]) -> StorageResult<UpsertCounts> {
        self.check_writable(samples.iter().map(|s| s.run_id.as_str()))?;
        let mut tables = self.tables.write().map_err(|_| StorageError::LockPoisoned)?;
        let mut counts = UpsertCounts::default();
        for sample in samples {
            match tables.samples.insert(sample.key(), sample.clone()) {
                None => counts.inserted += 1,
                Some(_) => counts.updated += 1,
            }
        }
        Ok(counts)
    }

    async fn insert_samples_if_absent(&self, samples: &[MetricSample]) -> StorageResult<u64> {
        self.check_writable(samples.iter().map(|s| s.run_id.as_str()))?;
        let mut tables = self.tables.write().map_err(|_| StorageError::LockPoisoned)?;
        let mut inserted = 0;
        for sample in samples {
            let key = sample.key();
            if !tables.samples.contains_key(&key) {
                tables.samples.insert(key, sample.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn upsert_trace_hops(&self, hops: &[TraceHop]) -> StorageResult<usize> {
        self.check_writable(hops.iter().map(|h| h.run_id.as_str()))?;
        let mut tables = self.tables.write().map_err(|_| StorageError::LockPoisoned)?;
        for hop in hops {
            tables
                .hops
                .insert((hop.run_id.clone(), hop.hop_idx), hop.clone());
        }
        Ok(hops.len())
    }

    async fn fetch_run_samples(&self, run_id: &str) -> StorageResult<Vec<StoredSample>> {
        self.check_available()?;
        let tables = self.tables.read().map_err(|_| StorageError::LockPoisoned)?;
        let mut rows: Vec<StoredSample> = tables
            .samples
            .values()
            .filter(|s| s.run_id == run_id)
            .cloned()
            .map(StoredSample::from)
            .collect();
        rows.sort_by(|a, b| b.ts.cmp(&a.ts));
        Ok(rows)
    }

    async fn trace_hops(&self, run_id: &str) -> StorageResult<Vec<TraceHop>> {
        self.check_available()?;
        let tables = self.tables.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(tables
            .hops
            .values()
            .filter(|h| h.run_id == run_id)
            .cloned()
            .collect())
    }

    async fn distinct_metric_units(
        &self,
        limit: Option<usize>,
    ) -> StorageResult<Vec<(String, Option<String>)>> {
        self.check_available()?;
        let tables = self.tables.read().map_err(|_| StorageError::LockPoisoned)?;
        let distinct: BTreeSet<(String, Option<String>)> = tables
            .samples
            .values()
            .map(|s| (s.metric_name.clone(), s.unit.clone()))
            .collect();
        Ok(distinct
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn ping(&self) -> StorageResult<()> {
        self.check_available()
    }
}

// ============================================================================
// TESTS
// ============================================================================
