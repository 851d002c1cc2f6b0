//! Results reported back to callers of the engine and query service

use crate::{BulkStatus, DbStatus, Metric, Timestamp};
use serde::{Deserialize, Serialize};

/// Rows inserted vs. updated by one upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpsertCounts {
    pub inserted: u64,
    pub updated: u64,
}

impl UpsertCounts {
    pub fn new(inserted: u64, updated: u64) -> Self {
        Self { inserted, updated }
    }
}

/// Outcome of a single-run ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct IngestReceipt {
    pub run_id: String,
    #[serde(flatten)]
    pub counts: UpsertCounts,
}

/// Per-run result inside a bulk ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BulkItemOutcome {
    pub run_id: String,
    #[serde(flatten)]
    pub counts: UpsertCounts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: BulkStatus,
}

impl BulkItemOutcome {
    pub fn ok(run_id: impl Into<String>, counts: UpsertCounts) -> Self {
        Self {
            run_id: run_id.into(),
            counts,
            error: None,
            status: BulkStatus::Ok,
        }
    }

    /// A non-ok outcome. Counts are always zero.
    pub fn failed(run_id: impl Into<String>, status: BulkStatus, error: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            counts: UpsertCounts::default(),
            error: Some(error.into()),
            status,
        }
    }
}

/// A run reconstructed from its stored rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RunView {
    pub run_id: String,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub ts: Option<Timestamp>,
    pub test_type: String,
    pub tool: String,
    pub src: Option<String>,
    pub dst: Option<String>,
    pub status: Option<String>,
    pub duration_s: Option<f64>,
    pub metrics: Vec<Metric>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub aux: Option<serde_json::Value>,
}

/// One distinct `(metric, unit)` pair known to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MetricCatalogEntry {
    pub name: String,
    pub unit: Option<String>,
    pub description: Option<String>,
}

/// Store reachability as seen by the query service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthReport {
    pub db: DbStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    pub fn ok() -> Self {
        Self {
            db: DbStatus::Ok,
            error: None,
        }
    }

    pub fn down(error: impl Into<String>) -> Self {
        Self {
            db: DbStatus::Down,
            error: Some(error.into()),
        }
    }
}
