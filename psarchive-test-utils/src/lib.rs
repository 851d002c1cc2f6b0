//! psarchive Test Utilities
//!
//! Shared fixtures, builders and proptest generators for the psarchive
//! crates' tests.

use chrono::{TimeZone, Utc};
use psarchive_core::{
    Endpoint, MeasurementEnvelope, MeasurementRequest, MeasurementRun, TestType, Timestamp,
};
use psarchive_storage::{InMemoryMetricStore, QueryService, UpsertEngine};
use serde_json::{json, Value};
use std::sync::Arc;

/// Fixed reference instant used by fixtures.
pub fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Engine and query service sharing one in-memory store.
pub fn memory_services() -> (InMemoryMetricStore, UpsertEngine, QueryService) {
    let store = InMemoryMetricStore::new();
    let shared = Arc::new(store.clone());
    (
        store,
        UpsertEngine::new(shared.clone()),
        QueryService::new(shared),
    )
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    use super::*;

    /// A realistic raw result for each test type.
    pub fn raw_result(test_type: TestType) -> Value {
        match test_type {
            TestType::Clock => json!({
                "succeeded": true,
                "difference": "PT0.0125S",
                "remote": {"offset": 0.0031}
            }),
            TestType::Latency => json!({
                "succeeded": true,
                "histogram-latency": {"10.0": 4, "12.5": 4, "15.0": 2},
                "packets-sent": 10,
                "packets-received": 10
            }),
            TestType::Mtu => json!({"succeeded": true, "mtu": 9000}),
            TestType::Rtt => json!({
                "succeeded": true,
                "mean": "PT0.0105S",
                "max": "PT0.0152S",
                "min": "PT0.0098S",
                "loss": 0.0
            }),
            TestType::Throughput => json!({
                "succeeded": true,
                "duration": "PT10S",
                "end": {
                    "sum_received": {"bits_per_second": 9.41e9},
                    "sum_sent": {"retransmits": 12}
                }
            }),
            TestType::Trace => json!({
                "succeeded": true,
                "paths": [[
                    {"ip": "10.0.0.1", "rtt": "PT0.001S"},
                    {"ip": "192.0.2.7", "rtt": "PT0.0042S"},
                    {},
                    {"ip": "198.51.100.9", "rtt": "PT0.0118S"}
                ]]
            }),
        }
    }

    /// Envelope between two fixed hosts carrying `raw_result(test_type)`.
    pub fn envelope(test_type: TestType) -> MeasurementEnvelope {
        MeasurementEnvelope::new(
            Endpoint::named("192.0.2.10", "ps-east"),
            Endpoint::named("192.0.2.20", "ps-west"),
            raw_result(test_type),
        )
        .with_ts("2024-06-01T12:00:00Z")
    }

    /// Envelope as a tagged request with a fixed run id.
    pub fn request(test_type: TestType, run_id: &str) -> MeasurementRequest {
        MeasurementRequest::new(test_type, envelope(test_type).with_run_id(run_id))
    }

    /// Normalized run for `test_type` with a fixed run id.
    pub fn run(test_type: TestType, run_id: &str) -> MeasurementRun {
        match request(test_type, run_id).normalize() {
            Ok(run) => run,
            Err(err) => panic!("fixture for {} failed to normalize: {}", test_type, err),
        }
    }

    /// JSON body accepted by POST /measurements/{test_type}.
    pub fn envelope_json(test_type: TestType, run_id: &str) -> Value {
        json!({
            "run_id": run_id,
            "ts": "2024-06-01T12:00:00Z",
            "src": {"ip": "192.0.2.10", "name": "ps-east"},
            "dst": {"ip": "192.0.2.20", "name": "ps-west"},
            "raw": raw_result(test_type),
        })
    }
}

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;

    pub fn arb_test_type() -> impl Strategy<Value = TestType> {
        prop::sample::select(TestType::ALL.to_vec())
    }

    pub fn arb_run_id() -> impl Strategy<Value = String> {
        "run-[0-9a-f]{8}"
    }

    pub fn arb_ipv4() -> impl Strategy<Value = String> {
        (1u8..=254, 0u8..=255, 0u8..=255, 1u8..=254)
            .prop_map(|(a, b, c, d)| format!("{}.{}.{}.{}", a, b, c, d))
    }

    /// Instants within a day of [`t0`], to the second.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (-86_400i64..86_400).prop_map(|offset| t0() + chrono::Duration::seconds(offset))
    }

    /// `PT<n>S` duration strings with millisecond precision.
    pub fn arb_iso_seconds() -> impl Strategy<Value = (String, f64)> {
        (0u32..100_000).prop_map(|millis| {
            let secs = f64::from(millis) / 1000.0;
            (format!("PT{:.3}S", secs), secs)
        })
    }

    /// Raw rtt result whose mean, max and min are all present.
    pub fn arb_rtt_raw() -> impl Strategy<Value = Value> {
        (arb_iso_seconds(), arb_iso_seconds(), arb_iso_seconds(), 0.0f64..100.0).prop_map(
            |((mean, _), (max, _), (min, _), loss)| {
                json!({"mean": mean, "max": max, "min": min, "loss": loss})
            },
        )
    }

    /// Envelope with fresh endpoints and a fixed-shape raw result.
    pub fn arb_envelope(test_type: TestType) -> impl Strategy<Value = MeasurementEnvelope> {
        (arb_run_id(), arb_ipv4(), arb_ipv4(), arb_timestamp()).prop_map(
            move |(run_id, src, dst, ts)| {
                MeasurementEnvelope::new(
                    Endpoint::new(src),
                    Endpoint::new(dst),
                    fixtures::raw_result(test_type),
                )
                .with_run_id(run_id)
                .with_ts(ts.to_rfc3339())
            },
        )
    }

    /// A normalized run of any test type with at least one metric.
    pub fn arb_run() -> impl Strategy<Value = MeasurementRun> {
        arb_test_type()
            .prop_flat_map(|t| arb_envelope(t).prop_map(move |env| (t, env)))
            .prop_filter_map("fixture must normalize", |(t, env)| {
                psarchive_core::normalize(t, &env).ok()
            })
    }
}
