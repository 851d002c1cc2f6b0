//! PostgreSQL Metric Store
//!
//! `MetricStore` over a deadpool-postgres pool. Rows live in
//! `ps_test_results` keyed by `(run_id, metric_name, ts)`; trace hops live in
//! `ps_trace_hops` keyed by `(run_id, hop_idx)`. Both tables are created at
//! startup when missing. TimescaleDB is optional.

use crate::config::PoolSettings;
use ::async_trait::async_trait;
use deadpool_postgres::{
    Config, Hook, HookError, ManagerConfig, Pool, PoolConfig, PoolError, RecyclingMethod,
    Runtime,
};
use psarchive_core::{
    MetricSample, StorageError, StorageResult, StoredSample, Timestamp, TraceHop, UpsertCounts,
};
use psarchive_storage::MetricStore;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};
use tracing::{debug, info, warn};

/// Columns written per metric row by the batch insert.
const SAMPLE_COLUMNS: usize = 12;

/// Rows per multi-row INSERT, keeping the bind count under the protocol's
/// 65535 limit.
const INSERT_CHUNK_ROWS: usize = 1000;

const MERGE_SAMPLE_SQL: &str = "\
INSERT INTO ps_test_results \
    (run_id, metric_name, ts, test_type, tool, src, dst, status, duration_s, metric_value, unit, aux) \
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
ON CONFLICT (run_id, metric_name, ts) DO UPDATE SET \
    test_type = EXCLUDED.test_type, \
    tool = EXCLUDED.tool, \
    src = EXCLUDED.src, \
    dst = EXCLUDED.dst, \
    status = EXCLUDED.status, \
    duration_s = EXCLUDED.duration_s, \
    metric_value = EXCLUDED.metric_value, \
    unit = EXCLUDED.unit, \
    aux = EXCLUDED.aux \
RETURNING (xmax = 0) AS inserted";

const UPSERT_HOP_SQL: &str = "\
INSERT INTO ps_trace_hops (run_id, hop_idx, ts, src, dst, hop_ip, rtt_ms) \
VALUES ($1, $2, $3, $4, $5, $6, $7) \
ON CONFLICT (run_id, hop_idx) DO UPDATE SET \
    ts = EXCLUDED.ts, \
    src = EXCLUDED.src, \
    dst = EXCLUDED.dst, \
    hop_ip = EXCLUDED.hop_ip, \
    rtt_ms = EXCLUDED.rtt_ms";

const FETCH_RUN_SQL: &str = "\
SELECT run_id, metric_name, ts, test_type, tool, src, dst, status, duration_s, metric_value, unit, aux \
FROM ps_test_results WHERE run_id = $1 ORDER BY ts DESC NULLS LAST";

const FETCH_HOPS_SQL: &str = "\
SELECT run_id, hop_idx, ts, src, dst, hop_ip, rtt_ms \
FROM ps_trace_hops WHERE run_id = $1 ORDER BY hop_idx";

/// Byte-order collation so `LIMIT` keeps the same prefix the query service sorts.
const DISTINCT_UNITS_SQL: &str = "\
SELECT DISTINCT metric_name COLLATE \"C\" AS metric_name, unit COLLATE \"C\" AS unit \
FROM ps_test_results ORDER BY 1, 2 NULLS FIRST";

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS ps_test_results (
    run_id       TEXT NOT NULL,
    metric_name  TEXT NOT NULL,
    ts           TIMESTAMPTZ NOT NULL,
    test_type    TEXT NOT NULL,
    tool         TEXT NOT NULL,
    src          TEXT,
    dst          TEXT,
    status       TEXT,
    duration_s   DOUBLE PRECISION,
    metric_value DOUBLE PRECISION NOT NULL,
    unit         TEXT,
    aux          JSONB,
    PRIMARY KEY (run_id, metric_name, ts)
);
CREATE INDEX IF NOT EXISTS ix_ps_test_results_ts ON ps_test_results (ts);
CREATE INDEX IF NOT EXISTS ix_ps_test_results_metric ON ps_test_results (metric_name);
CREATE INDEX IF NOT EXISTS ix_ps_test_results_pair ON ps_test_results (src, dst);
CREATE INDEX IF NOT EXISTS ix_ps_test_results_dir ON ps_test_results ((aux->>'traffic_dir'));
CREATE INDEX IF NOT EXISTS ix_ps_test_results_aux ON ps_test_results USING GIN (aux);

CREATE TABLE IF NOT EXISTS ps_trace_hops (
    run_id  TEXT NOT NULL,
    hop_idx INTEGER NOT NULL,
    ts      TIMESTAMPTZ NOT NULL,
    src     TEXT,
    dst     TEXT,
    hop_ip  TEXT,
    rtt_ms  DOUBLE PRECISION,
    PRIMARY KEY (run_id, hop_idx)
);
CREATE INDEX IF NOT EXISTS ix_ps_trace_hops_ts ON ps_trace_hops (ts);
CREATE INDEX IF NOT EXISTS ix_ps_trace_hops_ip ON ps_trace_hops (hop_ip);
CREATE INDEX IF NOT EXISTS ix_ps_trace_hops_pair ON ps_trace_hops (src, dst);
";

const TIMESCALE_SQL: [&str; 2] = [
    "CREATE EXTENSION IF NOT EXISTS timescaledb",
    "SELECT create_hypertable('ps_test_results', 'ts', if_not_exists => TRUE)",
];

// ============================================================================
// POOL
// ============================================================================

/// Build the connection pool. No connection is opened until first use.
///
/// Pool capacity is `size + max-overflow`; `timeout-s` bounds both waiting
/// for a slot and opening a connection, and connections older than
/// `recycle-s` are replaced when they come back for reuse.
pub fn create_pool(dsn: &str, settings: &PoolSettings) -> StorageResult<Pool> {
    let mut pool_config = PoolConfig::new(settings.max_connections());
    pool_config.timeouts.wait = Some(settings.timeout());
    pool_config.timeouts.create = Some(settings.timeout());

    let mut cfg = Config::new();
    cfg.url = Some(dsn.to_string());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(pool_config);

    let max_age = settings.max_age();
    cfg.builder(NoTls)
        .map_err(|e| StorageError::Pool {
            reason: format!("invalid connection settings: {}", e),
        })?
        .runtime(Runtime::Tokio1)
        .pre_recycle(Hook::sync_fn(move |_, metrics| {
            if metrics.age() >= max_age {
                Err(HookError::Message("connection exceeded max age".into()))
            } else {
                Ok(())
            }
        }))
        .build()
        .map_err(|e| StorageError::Pool {
            reason: format!("failed to create pool: {}", e),
        })
}

/// Create tables and indexes when missing.
///
/// With `timescale`, also enable the extension and turn `ps_test_results`
/// into a hypertable. Failures there only warn, so plain PostgreSQL works.
pub async fn ensure_schema(pool: &Pool, timescale: bool) -> StorageResult<()> {
    let client = pool.get().await.map_err(pool_error)?;
    client
        .batch_execute(SCHEMA_SQL)
        .await
        .map_err(|e| StorageError::Schema {
            reason: e.to_string(),
        })?;
    info!("schema ready");

    if timescale {
        for statement in TIMESCALE_SQL {
            if let Err(e) = client.batch_execute(statement).await {
                warn!(error = %e, statement, "timescaledb setup skipped");
                break;
            }
        }
    }
    Ok(())
}

/// Map a pool failure into the storage error taxonomy.
pub fn pool_error(err: PoolError) -> StorageError {
    match err {
        PoolError::Timeout(_) => StorageError::PoolTimeout,
        PoolError::Closed => StorageError::Pool {
            reason: "connection pool is closed".to_string(),
        },
        other => StorageError::Pool {
            reason: other.to_string(),
        },
    }
}

pub fn query_error(err: tokio_postgres::Error) -> StorageError {
    StorageError::Query {
        reason: err.to_string(),
    }
}

fn transaction_error(err: tokio_postgres::Error) -> StorageError {
    StorageError::Transaction {
        reason: err.to_string(),
    }
}

/// `($1, ..., $n), ($n+1, ...)` for `rows` rows of `columns` binds each.
fn values_clause(rows: usize, columns: usize) -> String {
    (0..rows)
        .map(|row| {
            let binds: Vec<String> = (1..=columns)
                .map(|col| format!("${}", row * columns + col))
                .collect();
            format!("({})", binds.join(", "))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn insert_if_absent_sql(rows: usize) -> String {
    format!(
        "INSERT INTO ps_test_results \
         (run_id, metric_name, ts, test_type, tool, src, dst, status, duration_s, metric_value, unit, aux) \
         VALUES {} ON CONFLICT (run_id, metric_name, ts) DO NOTHING RETURNING run_id",
        values_clause(rows, SAMPLE_COLUMNS)
    )
}

// ============================================================================
// STORE
// ============================================================================

/// `MetricStore` backed by PostgreSQL (optionally TimescaleDB).
#[derive(Clone)]
pub struct PgMetricStore {
    pool: Pool,
}

impl PgMetricStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    async fn get_conn(&self) -> StorageResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(pool_error)
    }
}

impl std::fmt::Debug for PgMetricStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("PgMetricStore")
            .field("size", &status.size)
            .field("available", &status.available)
            .field("max_size", &status.max_size)
            .finish()
    }
}

#[async_trait]
impl MetricStore for PgMetricStore {
    async fn merge_samples(&self, samples: &[MetricSample]) -> StorageResult<UpsertCounts> {
        let mut client = self.get_conn().await?;
        let tx = client.transaction().await.map_err(transaction_error)?;
        let stmt = tx.prepare_cached(MERGE_SAMPLE_SQL).await.map_err(query_error)?;

        let mut counts = UpsertCounts::default();
        for s in samples {
            let row = tx
                .query_one(
                    &stmt,
                    &[
                        &s.run_id,
                        &s.metric_name,
                        &s.ts,
                        &s.test_type.as_str(),
                        &s.tool,
                        &s.src,
                        &s.dst,
                        &s.status.as_str(),
                        &s.duration_s,
                        &s.metric_value,
                        &s.unit,
                        &s.aux,
                    ],
                )
                .await
                .map_err(query_error)?;
            if row.get::<_, bool>(0) {
                counts.inserted += 1;
            } else {
                counts.updated += 1;
            }
        }

        tx.commit().await.map_err(transaction_error)?;
        debug!(inserted = counts.inserted, updated = counts.updated, "merged samples");
        Ok(counts)
    }

    async fn insert_samples_if_absent(&self, samples: &[MetricSample]) -> StorageResult<u64> {
        if samples.is_empty() {
            return Ok(0);
        }
        let mut client = self.get_conn().await?;
        let tx = client.transaction().await.map_err(transaction_error)?;

        let mut inserted = 0u64;
        for chunk in samples.chunks(INSERT_CHUNK_ROWS) {
            let labels: Vec<(&str, &str)> = chunk
                .iter()
                .map(|s| (s.test_type.as_str(), s.status.as_str()))
                .collect();
            let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(chunk.len() * SAMPLE_COLUMNS);
            for (s, (test_type, status)) in chunk.iter().zip(&labels) {
                params.push(&s.run_id);
                params.push(&s.metric_name);
                params.push(&s.ts);
                params.push(test_type);
                params.push(&s.tool);
                params.push(&s.src);
                params.push(&s.dst);
                params.push(status);
                params.push(&s.duration_s);
                params.push(&s.metric_value);
                params.push(&s.unit);
                params.push(&s.aux);
            }
            let rows = tx
                .query(insert_if_absent_sql(chunk.len()).as_str(), &params)
                .await
                .map_err(query_error)?;
            inserted += rows.len() as u64;
        }

        tx.commit().await.map_err(transaction_error)?;
        debug!(inserted, offered = samples.len(), "inserted absent samples");
        Ok(inserted)
    }

    async fn upsert_trace_hops(&self, hops: &[TraceHop]) -> StorageResult<usize> {
        let mut client = self.get_conn().await?;
        let tx = client.transaction().await.map_err(transaction_error)?;
        let stmt = tx.prepare_cached(UPSERT_HOP_SQL).await.map_err(query_error)?;

        for hop in hops {
            tx.execute(
                &stmt,
                &[
                    &hop.run_id,
                    &hop.hop_idx,
                    &hop.ts,
                    &hop.src,
                    &hop.dst,
                    &hop.hop_ip,
                    &hop.rtt_ms,
                ],
            )
            .await
            .map_err(query_error)?;
        }

        tx.commit().await.map_err(transaction_error)?;
        Ok(hops.len())
    }

    async fn fetch_run_samples(&self, run_id: &str) -> StorageResult<Vec<StoredSample>> {
        let client = self.get_conn().await?;
        let rows = client
            .query(FETCH_RUN_SQL, &[&run_id])
            .await
            .map_err(query_error)?;
        rows.iter().map(stored_sample_from_row).collect()
    }

    async fn trace_hops(&self, run_id: &str) -> StorageResult<Vec<TraceHop>> {
        let client = self.get_conn().await?;
        let rows = client
            .query(FETCH_HOPS_SQL, &[&run_id])
            .await
            .map_err(query_error)?;
        rows.iter().map(trace_hop_from_row).collect()
    }

    async fn distinct_metric_units(
        &self,
        limit: Option<usize>,
    ) -> StorageResult<Vec<(String, Option<String>)>> {
        let client = self.get_conn().await?;
        let rows = match limit {
            Some(n) => {
                let n = i64::try_from(n).unwrap_or(i64::MAX);
                client
                    .query(format!("{} LIMIT $1", DISTINCT_UNITS_SQL).as_str(), &[&n])
                    .await
            }
            None => client.query(DISTINCT_UNITS_SQL, &[]).await,
        }
        .map_err(query_error)?;

        rows.iter()
            .map(|row| -> StorageResult<(String, Option<String>)> {
                let name = row.try_get(0).map_err(query_error)?;
                let unit = row.try_get(1).map_err(query_error)?;
                Ok((name, unit))
            })
            .collect()
    }

    async fn ping(&self) -> StorageResult<()> {
        let client = self.get_conn().await?;
        client.simple_query("SELECT 1").await.map_err(query_error)?;
        Ok(())
    }
}

fn stored_sample_from_row(row: &Row) -> StorageResult<StoredSample> {
    Ok(StoredSample {
        run_id: row.try_get("run_id").map_err(query_error)?,
        metric_name: row.try_get("metric_name").map_err(query_error)?,
        ts: row.try_get::<_, Option<Timestamp>>("ts").map_err(query_error)?,
        test_type: row.try_get("test_type").map_err(query_error)?,
        tool: row.try_get("tool").map_err(query_error)?,
        src: row.try_get("src").map_err(query_error)?,
        dst: row.try_get("dst").map_err(query_error)?,
        status: row.try_get("status").map_err(query_error)?,
        duration_s: row.try_get("duration_s").map_err(query_error)?,
        metric_value: row.try_get("metric_value").map_err(query_error)?,
        unit: row.try_get("unit").map_err(query_error)?,
        aux: row.try_get("aux").map_err(query_error)?,
    })
}

fn trace_hop_from_row(row: &Row) -> StorageResult<TraceHop> {
    Ok(TraceHop {
        run_id: row.try_get("run_id").map_err(query_error)?,
        hop_idx: row.try_get("hop_idx").map_err(query_error)?,
        ts: row.try_get("ts").map_err(query_error)?,
        src: row.try_get::<_, Option<String>>("src").map_err(query_error)?.unwrap_or_default(),
        dst: row.try_get::<_, Option<String>>("dst").map_err(query_error)?.unwrap_or_default(),
        hop_ip: row.try_get::<_, Option<String>>("hop_ip").map_err(query_error)?.unwrap_or_default(),
        rtt_ms: row.try_get("rtt_ms").map_err(query_error)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
