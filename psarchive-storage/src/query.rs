//! Read side: run reconstruction, metric catalog and store health.

use crate::store::MetricStore;
use psarchive_core::{
    metric_description, ArchiveError, ArchiveResult, HealthReport, Metric, MetricCatalogEntry,
    RunView, StoredSample, TraceHop,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Read-only view over the archive.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn MetricStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn MetricStore>) -> Self {
        Self { store }
    }

    /// Rebuild a run from its stored rows.
    ///
    /// Labels come from the newest row, metrics carry the latest value per
    /// name, and aux is the newest non-null one.
    #[tracing::instrument(skip(self))]
    pub async fn get_run(&self, run_id: &str) -> ArchiveResult<RunView> {
        let rows = self.store.fetch_run_samples(run_id).await?;
        let view = reconstruct_run(run_id, rows).ok_or_else(|| ArchiveError::NotFound {
            run_id: run_id.to_string(),
        })?;
        debug!(metrics = view.metrics.len(), "run reconstructed");
        Ok(view)
    }

    /// Hops stored for a trace run, by position.
    #[tracing::instrument(skip(self))]
    pub async fn trace_hops(&self, run_id: &str) -> ArchiveResult<Vec<TraceHop>> {
        Ok(self.store.trace_hops(run_id).await?)
    }

    /// Ping the store. Never fails; an unreachable store reports `down`.
    pub async fn health(&self) -> HealthReport {
        match self.store.ping().await {
            Ok(()) => HealthReport::ok(),
            Err(err) => {
                warn!(error = %err, "store health check failed");
                HealthReport::down(err.to_string())
            }
        }
    }

    /// Distinct metric names and units with their descriptions.
    ///
    /// A limit of zero is treated as no limit.
    #[tracing::instrument(skip(self))]
    pub async fn metric_catalog(
        &self,
        limit: Option<usize>,
    ) -> ArchiveResult<Vec<MetricCatalogEntry>> {
        let limit = limit.filter(|n| *n > 0);
        let mut pairs = self.store.distinct_metric_units(limit).await?;
        pairs.sort();
        pairs.dedup();
        if let Some(n) = limit {
            pairs.truncate(n);
        }
        Ok(pairs
            .into_iter()
            .map(|(name, unit)| MetricCatalogEntry {
                description: metric_description(&name).map(str::to_string),
                name,
                unit,
            })
            .collect())
    }
}

impl std::fmt::Debug for QueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryService").finish_non_exhaustive()
    }
}

/// Fold stored rows into a [`RunView`]. `None` when there are no rows.
///
/// Rows may arrive in any order. A null `ts` orders before every instant;
/// among rows with equal `ts` the first one seen wins.
pub fn reconstruct_run(run_id: &str, rows: Vec<StoredSample>) -> Option<RunView> {
    let newest = rows
        .iter()
        .fold(None::<&StoredSample>, |best, row| match best {
            Some(b) if row.ts <= b.ts => Some(b),
            _ => Some(row),
        })?;

    let mut latest: BTreeMap<&str, &StoredSample> = BTreeMap::new();
    for row in &rows {
        if row.metric_name.is_empty() {
            continue;
        }
        match latest.get(row.metric_name.as_str()) {
            Some(prev) if row.ts <= prev.ts => {}
            _ => {
                latest.insert(row.metric_name.as_str(), row);
            }
        }
    }
    let metrics = latest
        .into_iter()
        .map(|(name, row)| Metric {
            name: name.to_string(),
            value: row.metric_value,
            unit: row.unit.clone(),
        })
        .collect();

    let mut by_recency: Vec<&StoredSample> = rows.iter().collect();
    by_recency.sort_by(|a, b| b.ts.cmp(&a.ts));
    let aux = by_recency.iter().find_map(|row| row.aux.clone());

    Some(RunView {
        run_id: run_id.to_string(),
        ts: newest.ts,
        test_type: newest.test_type.clone(),
        tool: newest.tool.clone(),
        src: newest.src.clone(),
        dst: newest.dst.clone(),
        status: newest.status.clone(),
        duration_s: newest.duration_s,
        metrics,
        aux,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryMetricStore;
    use chrono::{Duration, TimeZone, Utc};
    use psarchive_core::{DbStatus, MetricSample, RunStatus, TestType, Timestamp};
    use serde_json::json;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
    }

    fn make_test_row(metric: &str, ts: Option<Timestamp>, value: f64) -> StoredSample {
        StoredSample {
            run_id: "r1".to_string(),
            metric_name: metric.to_string(),
            ts,
            test_type: "rtt".to_string(),
            tool: "ping".to_string(),
            src: Some("a".to_string()),
            dst: Some("b".to_string()),
            status: Some("success".to_string()),
            duration_s: None,
            metric_value: value,
            unit: Some("ms".to_string()),
            aux: None,
        }
    }

    fn make_test_sample(metric: &str, ts: Timestamp, value: f64, unit: Option<&str>) -> MetricSample {
        MetricSample {
            run_id: "r1".to_string(),
            metric_name: metric.to_string(),
            ts,
            test_type: TestType::Rtt,
            tool: "ping".to_string(),
            src: "a".to_string(),
            dst: "b".to_string(),
            status: RunStatus::Success,
            duration_s: None,
            metric_value: value,
            unit: unit.map(str::to_string),
            aux: None,
        }
    }

    #[test]
    fn test_latest_value_per_metric_sorted_by_name() {
        let rows = vec![
            make_test_row("mean_rtt_ms", Some(t0()), 1.0),
            make_test_row("loss_pct", Some(t0()), 0.0),
            make_test_row("mean_rtt_ms", Some(t0() + Duration::minutes(5)), 2.0),
        ];
        let view = reconstruct_run("r1", rows).unwrap();
        let metrics: Vec<(&str, f64)> = view.metrics.iter().map(|m| (m.name.as_str(), m.value)).collect();
        assert_eq!(metrics, vec![("loss_pct", 0.0), ("mean_rtt_ms", 2.0)]);
        assert_eq!(view.ts, Some(t0() + Duration::minutes(5)));
    }

    #[test]
    fn test_labels_from_newest_row() {
        let mut old = make_test_row("m", Some(t0()), 1.0);
        old.status = Some("success".to_string());
        let mut new = make_test_row("m", Some(t0() + Duration::hours(1)), 2.0);
        new.status = Some("failed".to_string());
        new.src = Some("renamed".to_string());
        let view = reconstruct_run("r1", vec![old, new]).unwrap();
        assert_eq!(view.status.as_deref(), Some("failed"));
        assert_eq!(view.src.as_deref(), Some("renamed"));
    }

    #[test]
    fn test_null_ts_sorts_earliest_and_ties_keep_first() {
        let undated = make_test_row("m", None, 9.0);
        let first = make_test_row("m", Some(t0()), 1.0);
        let tied = make_test_row("m", Some(t0()), 2.0);
        let view = reconstruct_run("r1", vec![undated, first, tied]).unwrap();
        assert_eq!(view.metrics[0].value, 1.0);
        assert_eq!(view.ts, Some(t0()));
    }

    #[test]
    fn test_newest_non_null_aux() {
        let mut oldest = make_test_row("a", Some(t0()), 1.0);
        oldest.aux = Some(json!({"v": 1}));
        let mut middle = make_test_row("b", Some(t0() + Duration::seconds(1)), 1.0);
        middle.aux = Some(json!({"v": 2}));
        let newest = make_test_row("c", Some(t0() + Duration::seconds(2)), 1.0);
        let view = reconstruct_run("r1", vec![oldest, newest, middle]).unwrap();
        assert_eq!(view.aux, Some(json!({"v": 2})));
    }

    #[test]
    fn test_no_rows_is_none() {
        assert!(reconstruct_run("r1", Vec::new()).is_none());
    }

    #[tokio::test]
    async fn test_get_run_not_found() {
        let query = QueryService::new(Arc::new(InMemoryMetricStore::new()));
        let err = query.get_run("missing").await.unwrap_err();
        assert_eq!(
            err,
            ArchiveError::NotFound {
                run_id: "missing".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_health_reports_down_without_failing() {
        let store = InMemoryMetricStore::new();
        let query = QueryService::new(Arc::new(store.clone()));
        assert_eq!(query.health().await.db, DbStatus::Ok);
        store.set_offline(true);
        let report = query.health().await;
        assert_eq!(report.db, DbStatus::Down);
        assert!(report.error.is_some());
    }

    #[tokio::test]
    async fn test_catalog_order_limit_and_descriptions() {
        let store = InMemoryMetricStore::new();
        store
            .merge_samples(&[
                make_test_sample("throughput_mbps", t0(), 1.0, Some("mbps")),
                make_test_sample("custom", t0(), 1.0, None),
                make_test_sample("custom", t0() + Duration::seconds(1), 1.0, Some("x")),
                make_test_sample("hop_count", t0(), 1.0, Some("count")),
            ])
            .await
            .unwrap();
        let query = QueryService::new(Arc::new(store));

        let all = query.metric_catalog(Some(0)).await.unwrap();
        let names: Vec<_> = all.iter().map(|e| (e.name.as_str(), e.unit.as_deref())).collect();
        assert_eq!(
            names,
            vec![
                ("custom", None),
                ("custom", Some("x")),
                ("hop_count", Some("count")),
                ("throughput_mbps", Some("mbps")),
            ]
        );
        assert_eq!(all[0].description, None);
        assert_eq!(all[2].description.as_deref(), Some("Traceroute hop count"));

        let limited = query.metric_catalog(Some(2)).await.unwrap();
        assert_eq!(limited.len(), 2);
    }
}
