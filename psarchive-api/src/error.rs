//! Error Types for the Archiver API
//!
//! - ErrorCode enum for categorizing errors
//! - ApiError struct for structured error responses
//! - Conversions from the core `ArchiveError` taxonomy
//!
//! All errors are serialized as JSON `{code, message, details?}` with the
//! HTTP status of their code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use psarchive_core::{ArchiveError, ConfigError, StorageError, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Authentication Errors (401)
    // ========================================================================
    Unauthorized,

    InvalidToken,

    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    ValidationFailed,

    MissingField,

    // ========================================================================
    // Not Found / Conflict (404, 409)
    // ========================================================================
    RunNotFound,

    UnknownTestType,

    DuplicateRows,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    InternalError,

    DatabaseError,

    ServiceUnavailable,

    ConnectionPoolExhausted,
}

impl ErrorCode {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized | ErrorCode::InvalidToken => StatusCode::UNAUTHORIZED,

            ErrorCode::ValidationFailed | ErrorCode::MissingField => StatusCode::BAD_REQUEST,

            ErrorCode::RunNotFound | ErrorCode::UnknownTestType => StatusCode::NOT_FOUND,

            ErrorCode::DuplicateRows => StatusCode::CONFLICT,

            ErrorCode::ServiceUnavailable | ErrorCode::ConnectionPoolExhausted => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            ErrorCode::InternalError | ErrorCode::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "Authentication required",
            ErrorCode::InvalidToken => "Invalid authentication token",
            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::MissingField => "Required field is missing",
            ErrorCode::RunNotFound => "Run not found",
            ErrorCode::UnknownTestType => "Unknown test type",
            ErrorCode::DuplicateRows => "Rows already exist",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database operation failed",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
            ErrorCode::ConnectionPoolExhausted => "Connection pool exhausted",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error body returned by every failing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    pub code: ErrorCode,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors
    // ========================================================================

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidToken, message)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
        .with_details(json!({ "field": field }))
    }

    pub fn run_not_found(run_id: &str) -> Self {
        Self::new(ErrorCode::RunNotFound, format!("run_id {} not found", run_id))
            .with_details(json!({ "run_id": run_id }))
    }

    pub fn unknown_test_type(name: &str) -> Self {
        Self::new(
            ErrorCode::UnknownTestType,
            format!("no measurement endpoint for test type '{}'", name),
        )
    }

    pub fn duplicate_rows(run_id: &str, duplicates: u64) -> Self {
        Self::new(
            ErrorCode::DuplicateRows,
            format!("{} row(s) already exist for run_id {}", duplicates, run_id),
        )
        .with_details(json!({ "run_id": run_id, "duplicates": duplicates }))
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::RequiredFieldMissing { field } => ApiError::missing_field(&field),
            other @ ValidationError::InvalidValue { .. } => {
                ApiError::new(ErrorCode::ValidationFailed, other.to_string())
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        tracing::error!(error = %err, "storage failure");
        match &err {
            StorageError::PoolTimeout => {
                ApiError::new(ErrorCode::ConnectionPoolExhausted, err.to_string())
            }
            StorageError::Pool { .. } => {
                ApiError::new(ErrorCode::ServiceUnavailable, err.to_string())
            }
            _ => ApiError::database_error(err.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::internal_error(err.to_string())
    }
}

impl From<ArchiveError> for ApiError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::Validation(e) => e.into(),
            ArchiveError::Conflict { run_id, duplicates } => {
                ApiError::duplicate_rows(&run_id, duplicates)
            }
            ArchiveError::Database(e) => e.into(),
            ArchiveError::NotFound { run_id } => ApiError::run_not_found(&run_id),
            ArchiveError::Config(e) => e.into(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
