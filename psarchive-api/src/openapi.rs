//! OpenAPI Specification for the Archiver API
//!
//! Generated with utoipa from the route annotations and the core types.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::{ApiError, ErrorCode};
use crate::routes::{archives, health, measurements};

use psarchive_core::{
    BulkItemOutcome, BulkStatus, DbStatus, Direction, Endpoint, IngestReceipt,
    MeasurementEnvelope, MeasurementRequest, Metric, MetricCatalogEntry, RunView, TestType,
    TraceHop, UpsertCounts, UpsertMode,
};

/// OpenAPI document for the archiver.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "psarchive API",
        description = "Archive for perfSONAR/pScheduler measurement results",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3500", description = "Local Development")
    ),
    tags(
        (name = "Measurements", description = "Normalize and store measurement runs"),
        (name = "Archives", description = "Read stored runs, trace hops and the metric catalog"),
        (name = "Health", description = "Process and database status")
    ),
    paths(
        measurements::ingest_measurement,
        measurements::ingest_bulk,
        archives::get_run,
        archives::get_trace_hops,
        archives::get_schema,
        health::health,
    ),
    components(
        schemas(
            ApiError, ErrorCode,
            Endpoint, Direction, MeasurementEnvelope, MeasurementRequest, TestType,
            UpsertMode, UpsertCounts, IngestReceipt, BulkStatus, BulkItemOutcome,
            Metric, RunView, TraceHop, MetricCatalogEntry, DbStatus,
            measurements::BulkIngestRequest, measurements::BulkIngestResponse,
            archives::SchemaResponse, archives::TraceHopsResponse,
            health::HealthResponse,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some("Shared archiver bearer token"))
                        .build(),
                ),
            );
        }
    }
}

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }

    /// Generate OpenAPI spec as YAML string.
    pub fn to_yaml() -> Result<String, String> {
        serde_yaml::to_string(&Self::openapi()).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() -> Result<(), String> {
        let openapi = ApiDoc::openapi();
        assert_eq!(openapi.info.title, "psarchive API");

        let components = openapi
            .components
            .as_ref()
            .ok_or_else(|| "OpenAPI components missing".to_string())?;
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("RunView"));

        for path in [
            "/measurements/{test_type}",
            "/measurements/bulk",
            "/ps/archives/{run_id}",
            "/ps/schema",
            "/ps/health",
        ] {
            assert!(openapi.paths.paths.contains_key(path), "missing {}", path);
        }
        Ok(())
    }

    #[test]
    fn test_openapi_serializes() -> Result<(), String> {
        let json = ApiDoc::to_json().map_err(|e| e.to_string())?;
        assert!(json.contains("\"openapi\""));
        let yaml = ApiDoc::to_yaml()?;
        assert!(yaml.contains("psarchive API"));
        Ok(())
    }
}
