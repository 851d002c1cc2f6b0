//! psarchive server binary.

use psarchive_api::telemetry::init_tracing;
use psarchive_api::{build_state, create_router, ApiError, ApiResult, ArchiverConfig};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let config = ArchiverConfig::load()?;
    init_tracing(&config.logging)?;

    let state = build_state(&config).await?;
    if !state.auth.is_enabled() {
        tracing::warn!("bearer token is empty, authentication disabled");
    }
    let app = create_router(state);

    let addr = config.runtime.bind_addr()?;
    tracing::info!(%addr, version = env!("CARGO_PKG_VERSION"), "Starting psarchive server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
