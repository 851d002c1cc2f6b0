//! psarchive Core - Metric Model and Normalizers
//!
//! Pure data structures and the per-test-type normalizers that turn raw
//! pScheduler output into canonical metric rows. No I/O happens here; the
//! storage and API crates depend on this one.

pub mod catalog;
pub mod duration;
pub mod entities;
pub mod envelope;
pub mod enums;
pub mod error;
pub mod normalize;
pub mod outcomes;

pub use catalog::metric_description;
pub use entities::{
    AuxMap, FlatHop, MeasurementRun, Metric, MetricSample, StoredSample, Timestamp, TraceHop,
};
pub use envelope::{Endpoint, MeasurementEnvelope, MeasurementRequest};
pub use enums::{
    BulkStatus, DbStatus, Direction, RunStatus, TestType, TestTypeParseError, UpsertMode,
};
pub use error::{
    ArchiveError, ArchiveResult, ConfigError, StorageError, StorageResult, ValidationError,
};
pub use normalize::{generate_run_id, normalize, parse_timestamp};
pub use outcomes::{
    BulkItemOutcome, HealthReport, IngestReceipt, MetricCatalogEntry, RunView, UpsertCounts,
};
