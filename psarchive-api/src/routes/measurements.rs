//! Measurement Ingest Endpoints
//!
//! - POST /measurements/{test_type} - normalize and store one run
//! - POST /measurements/bulk - store many runs, reporting each outcome

use axum::{
    extract::{Path, Query, State},
    routing::post,
    Json, Router,
};
use psarchive_core::{
    BulkItemOutcome, IngestReceipt, MeasurementEnvelope, MeasurementRequest, TestType, UpsertMode,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

/// `?mode=` on the single-run endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct ModeParams {
    /// `merge` (default) or `strict`.
    #[serde(default)]
    pub mode: UpsertMode,
}

/// Body of POST /measurements/bulk.
///
/// Items stay loose JSON until the engine decodes them one by one, so a
/// single malformed item cannot reject its siblings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BulkIngestRequest {
    #[serde(default)]
    pub mode: UpsertMode,
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<MeasurementRequest>))]
    pub measurements: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BulkIngestResponse {
    pub results: Vec<BulkItemOutcome>,
    pub ok: usize,
    pub failed: usize,
}

impl BulkIngestResponse {
    pub fn from_outcomes(results: Vec<BulkItemOutcome>) -> Self {
        let ok = results.iter().filter(|r| r.status.is_ok()).count();
        Self {
            failed: results.len() - ok,
            ok,
            results,
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// POST /measurements/{test_type} - Ingest one measurement run
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/measurements/{test_type}",
    tag = "Measurements",
    params(
        ("test_type" = String, Path, description = "clock, latency, mtu, rtt, throughput or trace"),
        ModeParams,
    ),
    request_body = MeasurementEnvelope,
    responses(
        (status = 200, description = "Run stored", body = IngestReceipt),
        (status = 400, description = "Missing or invalid field", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Unknown test type", body = ApiError),
        (status = 409, description = "Strict mode hit existing rows", body = ApiError),
        (status = 500, description = "Database failure", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn ingest_measurement(
    State(state): State<AppState>,
    Path(test_type): Path<String>,
    Query(params): Query<ModeParams>,
    Json(envelope): Json<MeasurementEnvelope>,
) -> ApiResult<Json<IngestReceipt>> {
    let test_type: TestType = test_type
        .parse()
        .map_err(|_| ApiError::unknown_test_type(&test_type))?;
    let request = MeasurementRequest::new(test_type, envelope);
    let receipt = state.engine.ingest(&request, params.mode).await?;
    Ok(Json(receipt))
}

/// POST /measurements/bulk - Ingest many runs independently
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/measurements/bulk",
    tag = "Measurements",
    request_body = BulkIngestRequest,
    responses(
        (status = 200, description = "Per-run outcomes", body = BulkIngestResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn ingest_bulk(
    State(state): State<AppState>,
    Json(req): Json<BulkIngestRequest>,
) -> Json<BulkIngestResponse> {
    let outcomes = state
        .engine
        .ingest_bulk_values(&req.measurements, req.mode)
        .await;
    Json(BulkIngestResponse::from_outcomes(outcomes))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/bulk", post(ingest_bulk))
        .route("/:test_type", post(ingest_measurement))
}
