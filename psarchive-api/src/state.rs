//! Shared application state for Axum routers.

use std::sync::Arc;

use axum::extract::FromRef;
use psarchive_storage::{MetricStore, QueryService, UpsertEngine};

use crate::middleware::AuthState;

/// Application-wide state shared across all routes.
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: UpsertEngine,
    pub query: QueryService,
    pub auth: AuthState,
    /// Reported by the health endpoint.
    pub version: &'static str,
}

impl AppState {
    /// Wire the engine and query service over one store.
    pub fn new(store: Arc<dyn MetricStore>, auth: AuthState) -> Self {
        Self {
            engine: UpsertEngine::new(store.clone()),
            query: QueryService::new(store),
            auth,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}
