//! Health Endpoint
//!
//! GET /ps/health answers 200 whenever the process is up; database
//! reachability is reported in the body. No authentication required.

use axum::{extract::State, routing::get, Json, Router};
use psarchive_core::DbStatus;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    /// Always `ok` when the process answers.
    pub status: String,
    pub db: DbStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub version: String,
}

/// GET /ps/health - Liveness plus database reachability
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/ps/health",
    tag = "Health",
    responses(
        (status = 200, description = "Process is up", body = HealthResponse),
    ),
))]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let report = state.query.health().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        db: report.db,
        error: report.error,
        version: state.version.to_string(),
    })
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/ps/health", get(health))
}
