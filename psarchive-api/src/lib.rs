//! psarchive API - REST Server over the Measurement Archive
//!
//! Axum routes for ingesting pScheduler results and reading them back, the
//! PostgreSQL implementation of `MetricStore`, the YAML configuration
//! loader and the tracing setup used by the `psarchive` binary.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use config::{ArchiverConfig, DatabaseConfig, LogFormat, LoggingConfig, PoolSettings};
pub use db::{create_pool, ensure_schema, PgMetricStore};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{auth_middleware, AuthState};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::create_router;
pub use state::AppState;

use std::sync::Arc;

/// Connect to PostgreSQL and wire the application state.
///
/// The pool connects lazily. Schema bootstrap failures are logged rather
/// than fatal so the server still starts and reports `db: down`.
pub async fn build_state(config: &ArchiverConfig) -> ApiResult<AppState> {
    let db = &config.database;
    let dsn = db.resolve_dsn();
    let pool = create_pool(&dsn, &db.pool)?;
    tracing::info!(
        max_connections = db.pool.max_connections(),
        timeout_s = db.pool.timeout_s,
        recycle_s = db.pool.recycle_s,
        "connection pool ready"
    );

    if let Err(err) = ensure_schema(&pool, db.create_tables && db.timescale).await {
        tracing::warn!(error = %err, "schema bootstrap failed, continuing");
    }

    let store = Arc::new(PgMetricStore::new(pool));
    let auth = AuthState::from_secret(config.runtime.bearer_token.clone());
    Ok(AppState::new(store, auth))
}
