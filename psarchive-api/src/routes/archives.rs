//! Archive Read Endpoints
//!
//! - GET /ps/archives/{run_id} - reconstructed run
//! - GET /ps/archives/{run_id}/hops - stored trace hops of a run
//! - GET /ps/schema - distinct metric names and units

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use psarchive_core::{MetricCatalogEntry, RunView, TraceHop};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `?limit=` on the schema endpoint. Zero or absent means no limit.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct SchemaParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SchemaResponse {
    pub metrics: Vec<MetricCatalogEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TraceHopsResponse {
    pub run_id: String,
    pub hops: Vec<TraceHop>,
}

/// GET /ps/archives/{run_id} - Reconstruct a stored run
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/ps/archives/{run_id}",
    tag = "Archives",
    params(("run_id" = String, Path, description = "Run identifier")),
    responses(
        (status = 200, description = "Run found", body = RunView),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "No rows for this run", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<Json<RunView>> {
    let view = state.query.get_run(&run_id).await?;
    Ok(Json(view))
}

/// GET /ps/archives/{run_id}/hops - Trace hops ordered by position
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/ps/archives/{run_id}/hops",
    tag = "Archives",
    params(("run_id" = String, Path, description = "Run identifier")),
    responses(
        (status = 200, description = "Hops of the run, possibly empty", body = TraceHopsResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn get_trace_hops(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<Json<TraceHopsResponse>> {
    let hops = state.query.trace_hops(&run_id).await?;
    Ok(Json(TraceHopsResponse { run_id, hops }))
}

/// GET /ps/schema - Metric catalog
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/ps/schema",
    tag = "Archives",
    params(SchemaParams),
    responses(
        (status = 200, description = "Distinct metric names and units", body = SchemaResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn get_schema(
    State(state): State<AppState>,
    Query(params): Query<SchemaParams>,
) -> ApiResult<Json<SchemaResponse>> {
    let metrics = state.query.metric_catalog(params.limit).await?;
    Ok(Json(SchemaResponse { metrics }))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/archives/:run_id", get(get_run))
        .route("/archives/:run_id/hops", get(get_trace_hops))
        .route("/schema", get(get_schema))
}
