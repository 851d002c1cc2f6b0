//! Fuzz the per-test-type normalizers with arbitrary JSON payloads.
//!
//! Normalization must never panic, must only fail on missing endpoint IPs,
//! and must never emit a non-finite metric value.
//!
//! Run with: cargo +nightly fuzz run normalize_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use psarchive_core::{normalize, Endpoint, MeasurementEnvelope, TestType};

fuzz_target!(|data: &[u8]| {
    let Some((&selector, payload)) = data.split_first() else {
        return;
    };
    let Ok(raw) = serde_json::from_slice::<serde_json::Value>(payload) else {
        return;
    };

    let test_type = TestType::ALL[usize::from(selector) % TestType::ALL.len()];
    let envelope = MeasurementEnvelope::new(
        Endpoint::new("192.0.2.1"),
        Endpoint::new("192.0.2.2"),
        raw,
    );

    let run = normalize(test_type, &envelope).expect("endpoints are present");
    for metric in &run.metrics {
        assert!(metric.value.is_finite(), "{} is not finite", metric.name);
    }
    if test_type == TestType::Trace {
        let hop_count = run.metrics.iter().find(|m| m.name == "hop_count");
        assert_eq!(hop_count.map(|m| m.value as usize), Some(run.hops.len()));
    }
});
