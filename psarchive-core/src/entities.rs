//! Canonical metric model: normalized runs and the rows they expand into

use crate::{RunStatus, TestType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// UTC instant used for every stored timestamp.
pub type Timestamp = DateTime<Utc>;

/// JSON object carried alongside a run.
pub type AuxMap = serde_json::Map<String, serde_json::Value>;

/// One named numeric reading extracted from a raw payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Metric {
    pub name: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: f64, unit: &str) -> Self {
        Self {
            name: name.into(),
            value,
            unit: Some(unit.to_string()),
        }
    }
}

/// One position along the first traceroute path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FlatHop {
    /// 1-based position along the path.
    pub idx: u32,
    pub ip: Option<String>,
    pub rtt_ms: Option<f64>,
}

/// Normalized form of one test execution.
///
/// Produced by a normalizer, consumed once by the upsert engine and then
/// dropped. Nothing here is persisted as-is; see [`MetricSample`].
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRun {
    pub run_id: String,
    pub ts: Timestamp,
    pub test_type: TestType,
    pub tool: String,
    pub src: String,
    pub dst: String,
    pub status: RunStatus,
    pub duration_s: Option<f64>,
    pub metrics: Vec<Metric>,
    pub aux: AuxMap,
    /// Flattened first path. Empty for everything but trace runs.
    pub hops: Vec<FlatHop>,
}

impl MeasurementRun {
    pub fn has_metrics(&self) -> bool {
        !self.metrics.is_empty()
    }
}

/// Durable row keyed by `(run_id, metric_name, ts)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub run_id: String,
    pub metric_name: String,
    pub ts: Timestamp,
    pub test_type: TestType,
    pub tool: String,
    pub src: String,
    pub dst: String,
    pub status: RunStatus,
    pub duration_s: Option<f64>,
    pub metric_value: f64,
    pub unit: Option<String>,
    pub aux: Option<serde_json::Value>,
}

impl MetricSample {
    /// Composite identity of the row.
    pub fn key(&self) -> (String, String, Timestamp) {
        (self.run_id.clone(), self.metric_name.clone(), self.ts)
    }
}

/// A stored row as read back from the store.
///
/// Label columns are plain strings since the store may hold rows written by
/// other producers; `ts` is optional because a null timestamp is legal on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSample {
    pub run_id: String,
    pub metric_name: String,
    pub ts: Option<Timestamp>,
    pub test_type: String,
    pub tool: String,
    pub src: Option<String>,
    pub dst: Option<String>,
    pub status: Option<String>,
    pub duration_s: Option<f64>,
    pub metric_value: f64,
    pub unit: Option<String>,
    pub aux: Option<serde_json::Value>,
}

impl From<MetricSample> for StoredSample {
    fn from(sample: MetricSample) -> Self {
        Self {
            run_id: sample.run_id,
            metric_name: sample.metric_name,
            ts: Some(sample.ts),
            test_type: sample.test_type.as_str().to_string(),
            tool: sample.tool,
            src: Some(sample.src),
            dst: Some(sample.dst),
            status: Some(sample.status.as_str().to_string()),
            duration_s: sample.duration_s,
            metric_value: sample.metric_value,
            unit: sample.unit,
            aux: sample.aux,
        }
    }
}

/// Durable per-hop row for trace runs, keyed by `(run_id, hop_idx)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TraceHop {
    pub run_id: String,
    pub hop_idx: i32,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub ts: Timestamp,
    pub src: String,
    pub dst: String,
    pub hop_ip: String,
    pub rtt_ms: Option<f64>,
}
