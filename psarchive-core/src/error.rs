//! Error types for psarchive operations

use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Connection pool error: {reason}")]
    Pool { reason: String },

    #[error("Timed out waiting for a pooled connection")]
    PoolTimeout,

    #[error("Query failed: {reason}")]
    Query { reason: String },

    #[error("Transaction failed: {reason}")]
    Transaction { reason: String },

    #[error("Schema bootstrap failed: {reason}")]
    Schema { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Validation errors raised before anything reaches storage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read configuration {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },
}

/// Master error type for all psarchive errors.
///
/// `Conflict` and `Validation` are first-class outcomes so callers can tell
/// "already ingested" and "bad request" apart from a broken store.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ArchiveError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{duplicates} duplicate metric row(s) for run_id={run_id} (PK: run_id, metric_name, ts)")]
    Conflict { run_id: String, duplicates: u64 },

    #[error("Database error: {0}")]
    Database(#[from] StorageError),

    #[error("Run not found: {run_id}")]
    NotFound { run_id: String },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl ArchiveError {
    /// Shorthand for a missing required field.
    pub fn missing_field(field: impl Into<String>) -> Self {
        ArchiveError::Validation(ValidationError::RequiredFieldMissing {
            field: field.into(),
        })
    }

    /// True when the error is a strict-mode duplicate key.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ArchiveError::Conflict { .. })
    }
}

/// Result type alias for psarchive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Result type alias for storage backends.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// TESTS
// =============================================================================
