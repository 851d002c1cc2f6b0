//! REST API Routes Module
//!
//! - Measurement ingest (single run and bulk)
//! - Archive reads (run reconstruction, trace hops, metric catalog)
//! - Health check (no authentication)
//! - OpenAPI document (no authentication)

pub mod archives;
pub mod health;
pub mod measurements;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    middleware::from_fn_with_state,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::middleware::auth_middleware;
use crate::state::AppState;

/// Largest accepted request body; bulk ingests can be large.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Build the full application router.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .nest("/measurements", measurements::create_router())
        .nest("/ps", archives::create_router())
        .route_layer(from_fn_with_state(state.auth.clone(), auth_middleware));

    let public = health::create_router();
    #[cfg(feature = "openapi")]
    let public = public.route("/openapi.json", axum::routing::get(openapi_json));

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// GET /openapi.json
#[cfg(feature = "openapi")]
async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    use utoipa::OpenApi;
    axum::Json(crate::openapi::ApiDoc::openapi())
}
