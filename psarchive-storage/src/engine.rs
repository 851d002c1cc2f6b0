//! Upsert engine: writes normalized runs into the store exactly once per key.
//!
//! Merge mode overwrites non-key columns of existing rows inside a single
//! transaction. Strict mode inserts only absent keys, commits what it
//! inserted, and then reports the remainder as a conflict.

use crate::store::MetricStore;
use psarchive_core::{
    ArchiveError, ArchiveResult, BulkItemOutcome, BulkStatus, IngestReceipt, MeasurementRequest,
    MeasurementRun, MetricSample, TestType, TraceHop, UpsertCounts, UpsertMode, ValidationError,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reported for bulk items whose run id could not be determined.
pub const UNKNOWN_RUN_ID: &str = "unknown";

const EMPTY_METRICS: &str = "metrics[] is required and must be non-empty";

/// Write side of the archive.
#[derive(Clone)]
pub struct UpsertEngine {
    store: Arc<dyn MetricStore>,
}

impl UpsertEngine {
    pub fn new(store: Arc<dyn MetricStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn MetricStore> {
        &self.store
    }

    /// Expand a run into one row per metric, duplicating labels and aux.
    pub fn rows_from_run(run: &MeasurementRun) -> Vec<MetricSample> {
        let aux = serde_json::Value::Object(run.aux.clone());
        run.metrics
            .iter()
            .map(|metric| MetricSample {
                run_id: run.run_id.clone(),
                metric_name: metric.name.clone(),
                ts: run.ts,
                test_type: run.test_type,
                tool: run.tool.clone(),
                src: run.src.clone(),
                dst: run.dst.clone(),
                status: run.status,
                duration_s: run.duration_s,
                metric_value: metric.value,
                unit: metric.unit.clone(),
                aux: Some(aux.clone()),
            })
            .collect()
    }

    /// Persist one run's metric rows.
    #[tracing::instrument(skip(self, run), fields(run_id = %run.run_id, mode = %mode))]
    pub async fn upsert_run(
        &self,
        run: &MeasurementRun,
        mode: UpsertMode,
    ) -> ArchiveResult<UpsertCounts> {
        let rows = Self::rows_from_run(run);
        if rows.is_empty() {
            debug!("run has no metrics, nothing to write");
            return Ok(UpsertCounts::default());
        }

        let counts = match mode {
            UpsertMode::Merge => self.store.merge_samples(&rows).await?,
            UpsertMode::StrictInsert => {
                let submitted = rows.len() as u64;
                let inserted = self.store.insert_samples_if_absent(&rows).await?;
                if inserted < submitted {
                    let duplicates = submitted - inserted;
                    warn!(inserted, duplicates, "strict insert hit existing keys");
                    return Err(ArchiveError::Conflict {
                        run_id: run.run_id.clone(),
                        duplicates,
                    });
                }
                UpsertCounts::new(inserted, 0)
            }
        };

        info!(inserted = counts.inserted, updated = counts.updated, "run upserted");
        Ok(counts)
    }

    /// Persist each run independently, classifying every outcome.
    #[tracing::instrument(skip(self, runs), fields(runs = runs.len(), mode = %mode))]
    pub async fn upsert_bulk(
        &self,
        runs: &[MeasurementRun],
        mode: UpsertMode,
    ) -> Vec<BulkItemOutcome> {
        let mut outcomes = Vec::with_capacity(runs.len());
        for run in runs {
            outcomes.push(self.bulk_item(run, mode).await);
        }
        outcomes
    }

    /// Store one [`TraceHop`] per flattened hop that has an IP.
    #[tracing::instrument(skip(self, run), fields(run_id = %run.run_id))]
    pub async fn materialize_trace_hops(&self, run: &MeasurementRun) -> ArchiveResult<usize> {
        let hops: Vec<TraceHop> = run
            .hops
            .iter()
            .filter_map(|hop| {
                let ip = hop.ip.as_deref().filter(|ip| !ip.is_empty())?;
                Some(TraceHop {
                    run_id: run.run_id.clone(),
                    hop_idx: i32::try_from(hop.idx).ok()?,
                    ts: run.ts,
                    src: run.src.clone(),
                    dst: run.dst.clone(),
                    hop_ip: ip.to_string(),
                    rtt_ms: hop.rtt_ms,
                })
            })
            .collect();

        if hops.is_empty() {
            return Ok(0);
        }
        let written = self.store.upsert_trace_hops(&hops).await?;
        debug!(written, skipped = run.hops.len() - hops.len(), "trace hops stored");
        Ok(written)
    }

    /// Normalize and persist a single request.
    pub async fn ingest(
        &self,
        request: &MeasurementRequest,
        mode: UpsertMode,
    ) -> ArchiveResult<IngestReceipt> {
        let run = request.normalize()?;
        let counts = self.upsert_run(&run, mode).await?;
        if run.test_type == TestType::Trace {
            self.materialize_trace_hops(&run).await?;
        }
        Ok(IngestReceipt {
            run_id: run.run_id,
            counts,
        })
    }

    /// Normalize and persist many requests, isolating failures per request.
    #[tracing::instrument(skip(self, requests), fields(requests = requests.len(), mode = %mode))]
    pub async fn ingest_bulk(
        &self,
        requests: &[MeasurementRequest],
        mode: UpsertMode,
    ) -> Vec<BulkItemOutcome> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            let run_id = request.envelope().supplied_run_id();
            outcomes.push(self.bulk_request(request.normalize(), run_id, mode).await);
        }
        Self::log_bulk_summary(&outcomes);
        outcomes
    }

    /// Like [`ingest_bulk`](Self::ingest_bulk), but each item is decoded on its
    /// own so a malformed item is reported `invalid` instead of failing the
    /// whole batch.
    #[tracing::instrument(skip(self, items), fields(requests = items.len(), mode = %mode))]
    pub async fn ingest_bulk_values(
        &self,
        items: &[serde_json::Value],
        mode: UpsertMode,
    ) -> Vec<BulkItemOutcome> {
        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            let run_id = item
                .get("run_id")
                .and_then(serde_json::Value::as_str)
                .filter(|id| !id.is_empty());
            let run = MeasurementRequest::from_value(item.clone())
                .and_then(|request| request.normalize());
            outcomes.push(self.bulk_request(run, run_id, mode).await);
        }
        Self::log_bulk_summary(&outcomes);
        outcomes
    }

    async fn bulk_request(
        &self,
        run: Result<MeasurementRun, ValidationError>,
        supplied_run_id: Option<&str>,
        mode: UpsertMode,
    ) -> BulkItemOutcome {
        match run {
            Ok(run) => self.bulk_item(&run, mode).await,
            Err(err) => {
                let run_id = supplied_run_id.unwrap_or(UNKNOWN_RUN_ID);
                warn!(run_id, error = %err, "bulk item rejected");
                BulkItemOutcome::failed(run_id, BulkStatus::Invalid, err.to_string())
            }
        }
    }

    fn log_bulk_summary(outcomes: &[BulkItemOutcome]) {
        let ok = outcomes.iter().filter(|o| o.status.is_ok()).count();
        info!(ok, failed = outcomes.len() - ok, "bulk ingest finished");
    }

    async fn bulk_item(&self, run: &MeasurementRun, mode: UpsertMode) -> BulkItemOutcome {
        if !run.has_metrics() {
            return BulkItemOutcome::failed(&run.run_id, BulkStatus::Invalid, EMPTY_METRICS);
        }

        let counts = match self.upsert_run(run, mode).await {
            Ok(counts) => counts,
            Err(err) => return Self::classify_failure(&run.run_id, err),
        };

        if run.test_type == TestType::Trace {
            if let Err(err) = self.materialize_trace_hops(run).await {
                return Self::classify_failure(&run.run_id, err);
            }
        }
        BulkItemOutcome::ok(&run.run_id, counts)
    }

    fn classify_failure(run_id: &str, err: ArchiveError) -> BulkItemOutcome {
        let status = match &err {
            ArchiveError::Conflict { .. } => BulkStatus::Conflict,
            ArchiveError::Validation(_) => BulkStatus::Invalid,
            _ => BulkStatus::Error,
        };
        if status == BulkStatus::Error {
            warn!(run_id, error = %err, "bulk item failed");
        }
        BulkItemOutcome::failed(run_id, status, err.to_string())
    }
}

impl std::fmt::Debug for UpsertEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpsertEngine").finish_non_exhaustive()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryMetricStore;
    use psarchive_core::{Endpoint, FlatHop, MeasurementEnvelope, Metric, RunStatus};
    use serde_json::json;

    fn make_test_run(run_id: &str, metrics: Vec<Metric>) -> MeasurementRun {
        let mut aux = psarchive_core::AuxMap::new();
        aux.insert("k".to_string(), json!("v"));
        MeasurementRun {
            run_id: run_id.to_string(),
            ts: psarchive_core::parse_timestamp("2024-05-01T00:00:00Z").unwrap(),
            test_type: TestType::Rtt,
            tool: "ping".to_string(),
            src: "a".to_string(),
            dst: "b".to_string(),
            status: RunStatus::Success,
            duration_s: Some(10.0),
            metrics,
            aux,
            hops: Vec::new(),
        }
    }

    fn two_metrics() -> Vec<Metric> {
        vec![
            Metric::new("mean_rtt_ms", 12.0, "ms"),
            Metric::new("loss_pct", 0.0, "pct"),
        ]
    }

    fn engine() -> (UpsertEngine, InMemoryMetricStore) {
        let store = InMemoryMetricStore::new();
        (UpsertEngine::new(Arc::new(store.clone())), store)
    }

    #[test]
    fn test_rows_duplicate_labels_and_aux() {
        let rows = UpsertEngine::rows_from_run(&make_test_run("r1", two_metrics()));
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.run_id, "r1");
            assert_eq!(row.duration_s, Some(10.0));
            assert_eq!(row.aux, Some(json!({"k": "v"})));
        }
        assert_eq!(rows[1].metric_name, "loss_pct");
        assert_eq!(rows[1].unit.as_deref(), Some("pct"));
    }

    #[tokio::test]
    async fn test_merge_twice_is_idempotent() {
        let (engine, store) = engine();
        let run = make_test_run("r1", two_metrics());
        let first = engine.upsert_run(&run, UpsertMode::Merge).await.unwrap();
        assert_eq!(first, UpsertCounts::new(2, 0));
        let snapshot = store.samples();

        let second = engine.upsert_run(&run, UpsertMode::Merge).await.unwrap();
        assert_eq!(second, UpsertCounts::new(0, 2));
        assert_eq!(store.samples(), snapshot);
    }

    #[tokio::test]
    async fn test_strict_conflict_counts_duplicates() {
        let (engine, store) = engine();
        let run = make_test_run("r1", two_metrics());
        engine.upsert_run(&run, UpsertMode::Merge).await.unwrap();
        let snapshot = store.samples();

        let err = engine
            .upsert_run(&run, UpsertMode::StrictInsert)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ArchiveError::Conflict {
                run_id: "r1".to_string(),
                duplicates: 2
            }
        );
        assert_eq!(store.samples(), snapshot);
    }

    #[tokio::test]
    async fn test_strict_partial_commit() {
        let (engine, store) = engine();
        engine
            .upsert_run(&make_test_run("r1", vec![Metric::new("mean_rtt_ms", 1.0, "ms")]), UpsertMode::Merge)
            .await
            .unwrap();

        let err = engine
            .upsert_run(&make_test_run("r1", two_metrics()), UpsertMode::StrictInsert)
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Conflict { duplicates: 1, .. }));
        assert_eq!(store.sample_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_run_does_not_touch_store() {
        let (engine, store) = engine();
        store.set_offline(true);
        let counts = engine
            .upsert_run(&make_test_run("r1", Vec::new()), UpsertMode::Merge)
            .await
            .unwrap();
        assert_eq!(counts, UpsertCounts::default());
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_as_database_error() {
        let (engine, store) = engine();
        store.fail_writes_for("r1");
        let err = engine
            .upsert_run(&make_test_run("r1", two_metrics()), UpsertMode::Merge)
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Database(_)));
    }

    #[tokio::test]
    async fn test_bulk_isolates_each_run() {
        let (engine, store) = engine();
        store.fail_writes_for("broken");
        engine
            .upsert_run(&make_test_run("dupe", two_metrics()), UpsertMode::Merge)
            .await
            .unwrap();

        let runs = vec![
            make_test_run("good", two_metrics()),
            make_test_run("empty", Vec::new()),
            make_test_run("broken", two_metrics()),
            make_test_run("dupe", two_metrics()),
        ];
        let outcomes = engine.upsert_bulk(&runs, UpsertMode::StrictInsert).await;
        let statuses: Vec<_> = outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![
                BulkStatus::Ok,
                BulkStatus::Invalid,
                BulkStatus::Error,
                BulkStatus::Conflict
            ]
        );
        assert_eq!(outcomes[0].counts, UpsertCounts::new(2, 0));
        assert_eq!(outcomes[1].error.as_deref(), Some(EMPTY_METRICS));
        assert!(outcomes[1..].iter().all(|o| o.counts == UpsertCounts::default()));
    }

    #[tokio::test]
    async fn test_hops_without_ip_are_skipped() {
        let (engine, store) = engine();
        let mut run = make_test_run("t1", vec![Metric::new("hop_count", 3.0, "count")]);
        run.test_type = TestType::Trace;
        run.hops = vec![
            FlatHop { idx: 1, ip: Some("10.0.0.1".to_string()), rtt_ms: Some(1.0) },
            FlatHop { idx: 2, ip: None, rtt_ms: None },
            FlatHop { idx: 3, ip: Some(String::new()), rtt_ms: Some(3.0) },
        ];
        assert_eq!(engine.materialize_trace_hops(&run).await.unwrap(), 1);
        let hops = store.trace_hops("t1").await.unwrap();
        assert_eq!(hops.len(), 1);
        assert_eq!(hops[0].hop_idx, 1);

        run.hops[0].rtt_ms = Some(5.0);
        engine.materialize_trace_hops(&run).await.unwrap();
        let hops = store.trace_hops("t1").await.unwrap();
        assert_eq!(hops.len(), 1);
        assert_eq!(hops[0].rtt_ms, Some(5.0));
    }

    #[tokio::test]
    async fn test_ingest_trace_materializes_hops() {
        let (engine, store) = engine();
        let request = MeasurementRequest::new(
            TestType::Trace,
            MeasurementEnvelope::new(
                Endpoint::new("10.0.0.1"),
                Endpoint::new("10.0.0.9"),
                json!({"paths": [[{"ip": "10.0.0.1", "rtt": "PT0.010S"}, {"ip": "10.0.0.2", "rtt": "PT0.020S"}]]}),
            )
            .with_run_id("trace-1"),
        );
        let receipt = engine.ingest(&request, UpsertMode::Merge).await.unwrap();
        assert_eq!(receipt.run_id, "trace-1");
        assert_eq!(receipt.counts, UpsertCounts::new(1, 0));
        assert_eq!(store.hop_count(), 2);
    }

    #[tokio::test]
    async fn test_ingest_rejects_before_storage() {
        let (engine, store) = engine();
        let mut envelope = MeasurementEnvelope::new(Endpoint::new("10.0.0.1"), Endpoint::default(), json!({"mtu": 1500}));
        envelope.run_id = Some("x".to_string());
        let err = engine
            .ingest(&MeasurementRequest::new(TestType::Mtu, envelope), UpsertMode::Merge)
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Validation(_)));
        assert_eq!(store.sample_count(), 0);
    }

    #[tokio::test]
    async fn test_ingest_bulk_invalid_uses_supplied_or_unknown_id() {
        let (engine, _store) = engine();
        let bad_named = MeasurementEnvelope {
            run_id: Some("named".to_string()),
            ..Default::default()
        };
        let good = MeasurementEnvelope::new(Endpoint::new("a"), Endpoint::new("b"), json!({"mtu": 1500}));
        let requests = vec![
            MeasurementRequest::new(TestType::Mtu, bad_named),
            MeasurementRequest::new(TestType::Mtu, MeasurementEnvelope::default()),
            MeasurementRequest::new(TestType::Mtu, good),
        ];
        let outcomes = engine.ingest_bulk(&requests, UpsertMode::Merge).await;
        assert_eq!(outcomes[0].run_id, "named");
        assert_eq!(outcomes[0].status, BulkStatus::Invalid);
        assert_eq!(outcomes[1].run_id, UNKNOWN_RUN_ID);
        assert_eq!(outcomes[2].status, BulkStatus::Ok);
        assert!(outcomes[2].run_id.starts_with("run-"));
    }

    #[tokio::test]
    async fn test_ingest_bulk_values_isolates_undecodable_items() {
        let (engine, store) = engine();
        let items = vec![
            json!({"test_type": "mtu", "run_id": "good", "src": {"ip": "a"}, "dst": {"ip": "b"},
                   "raw": {"mtu": 1500}}),
            json!({"test_type": "dns", "run_id": "odd", "raw": {}}),
            json!({"test_type": "mtu", "src": "not-an-endpoint"}),
            json!({"test_type": "mtu", "run_id": "epoch", "src": {"ip": "a"}, "dst": {"ip": "b"},
                   "ts": 1700000000, "raw": {"mtu": 9000}}),
        ];
        let outcomes = engine.ingest_bulk_values(&items, UpsertMode::Merge).await;
        assert_eq!(outcomes.len(), 4);
        assert_eq!(outcomes[0].status, BulkStatus::Ok);
        assert_eq!(outcomes[1].run_id, "odd");
        assert_eq!(outcomes[1].status, BulkStatus::Invalid);
        assert_eq!(outcomes[2].run_id, UNKNOWN_RUN_ID);
        assert_eq!(outcomes[2].status, BulkStatus::Invalid);
        assert_eq!(outcomes[3].status, BulkStatus::Ok);
        assert_eq!(store.sample_count(), 2);
    }
}
