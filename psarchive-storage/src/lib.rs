//! psarchive Storage - Store Trait, Upsert Engine and Query Service
//!
//! Defines the storage abstraction the archive writes through, an in-memory
//! implementation of it, and the engine and query service built on top.
//! The PostgreSQL implementation lives in psarchive-api.

pub mod engine;
pub mod memory;
pub mod query;
pub mod store;

pub use engine::{UpsertEngine, UNKNOWN_RUN_ID};
pub use memory::InMemoryMetricStore;
pub use query::{reconstruct_run, QueryService};
pub use store::MetricStore;
