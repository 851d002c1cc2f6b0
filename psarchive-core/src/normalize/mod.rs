//! Payload normalizers
//!
//! Each test type has an extractor turning its raw tool output into metrics.
//! Everything else about a run (identity, timestamp, labels, status, aux) is
//! derived the same way for every type, in [`normalize`].
//!
//! Extractors never fail: a value that cannot be read simply drops the metric
//! it would have produced. The only hard failure is a missing endpoint IP.

mod clock;
mod latency;
mod mtu;
mod rtt;
mod throughput;
mod trace;
pub mod value;

pub use trace::hop_ips;

use crate::{
    AuxMap, Endpoint, FlatHop, MeasurementEnvelope, MeasurementRun, Metric, RunStatus, TestType,
    Timestamp, ValidationError,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// Normalize an envelope as a run of `test_type`.
pub fn normalize(
    test_type: TestType,
    envelope: &MeasurementEnvelope,
) -> Result<MeasurementRun, ValidationError> {
    let src = required_endpoint(envelope.src.as_ref(), "src.ip")?;
    let dst = required_endpoint(envelope.dst.as_ref(), "dst.ip")?;

    let raw = &envelope.raw;
    let (metrics, hops) = extract(test_type, raw);

    let mut aux = base_aux(raw);
    aux.insert("src".to_string(), endpoint_json(src));
    aux.insert("dst".to_string(), endpoint_json(dst));
    if let Some(direction) = envelope.direction {
        aux.insert("traffic_dir".to_string(), Value::from(direction.as_str()));
    }
    if test_type == TestType::Trace {
        aux.insert("hops_flat".to_string(), serde_json::to_value(&hops).unwrap_or_default());
        aux.insert("hop_ips".to_string(), Value::from(hop_ips(&hops)));
    }

    Ok(MeasurementRun {
        run_id: envelope
            .supplied_run_id()
            .map(str::to_string)
            .unwrap_or_else(generate_run_id),
        ts: envelope
            .ts
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now),
        test_type,
        tool: test_type.tool().to_string(),
        src: src.label(),
        dst: dst.label(),
        status: run_status(raw),
        duration_s: raw.get("duration").and_then(value::seconds),
        metrics,
        aux,
        hops,
    })
}

fn extract(test_type: TestType, raw: &Value) -> (Vec<Metric>, Vec<FlatHop>) {
    match test_type {
        TestType::Clock => (clock::extract(raw), Vec::new()),
        TestType::Latency => (latency::extract(raw), Vec::new()),
        TestType::Mtu => (mtu::extract(raw), Vec::new()),
        TestType::Rtt => (rtt::extract(raw), Vec::new()),
        TestType::Throughput => (throughput::extract(raw), Vec::new()),
        TestType::Trace => trace::extract(raw),
    }
}

fn required_endpoint<'a>(
    endpoint: Option<&'a Endpoint>,
    field: &str,
) -> Result<&'a Endpoint, ValidationError> {
    endpoint
        .filter(|e| e.ip().is_some())
        .ok_or_else(|| ValidationError::RequiredFieldMissing {
            field: field.to_string(),
        })
}

fn endpoint_json(endpoint: &Endpoint) -> Value {
    serde_json::to_value(endpoint).unwrap_or(Value::Null)
}

/// Raw object as the base of aux. Scalars and arrays are kept under `raw`.
fn base_aux(raw: &Value) -> AuxMap {
    match raw {
        Value::Object(map) => map.clone(),
        Value::Null => AuxMap::new(),
        other => {
            let mut aux = AuxMap::new();
            aux.insert("raw".to_string(), other.clone());
            aux
        }
    }
}

fn run_status(raw: &Value) -> RunStatus {
    match raw.get("succeeded") {
        Some(Value::Bool(false)) => RunStatus::Failed,
        _ => RunStatus::Success,
    }
}

/// `run-` followed by eight random lowercase hex digits.
pub fn generate_run_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("run-{}", &hex[..8])
}

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(input: &str) -> Option<Timestamp> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(input, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Direction;
    use chrono::TimeZone;
    use serde_json::json;

    fn envelope(raw: Value) -> MeasurementEnvelope {
        MeasurementEnvelope::new(
            Endpoint::named("10.0.0.1", "alpha"),
            Endpoint::new("10.0.0.2"),
            raw,
        )
    }

    #[test]
    fn test_missing_dst_ip_rejected_for_every_type() {
        for t in TestType::ALL {
            let mut env = envelope(json!({}));
            env.dst = Some(Endpoint::default());
            let err = normalize(t, &env).unwrap_err();
            assert_eq!(
                err,
                ValidationError::RequiredFieldMissing {
                    field: "dst.ip".to_string()
                }
            );
        }
    }

    #[test]
    fn test_src_checked_before_dst() {
        let env = MeasurementEnvelope::default();
        let err = normalize(TestType::Rtt, &env).unwrap_err();
        assert!(err.to_string().contains("src.ip"));
    }

    #[test]
    fn test_labels_status_and_aux() {
        let env = envelope(json!({"succeeded": false, "mean": "PT0.01S"}))
            .with_run_id("run-abc")
            .with_ts("2024-05-01T12:00:00Z")
            .with_direction(Direction::Reverse);
        let run = normalize(TestType::Rtt, &env).unwrap();

        assert_eq!(run.run_id, "run-abc");
        assert_eq!(run.ts, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        assert_eq!(run.tool, "ping");
        assert_eq!(run.src, "alpha");
        assert_eq!(run.dst, "10.0.0.2");
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.aux["traffic_dir"], "reverse");
        assert_eq!(run.aux["src"], json!({"ip": "10.0.0.1", "name": "alpha"}));
        assert_eq!(run.aux["mean"], "PT0.01S");
        assert!(run.hops.is_empty());
    }

    #[test]
    fn test_generated_run_id_shape() {
        let run = normalize(TestType::Clock, &envelope(json!({})).with_run_id("")).unwrap();
        assert!(run.run_id.starts_with("run-"));
        assert_eq!(run.run_id.len(), 12);
        assert!(run.run_id[4..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_unparseable_duration_omits_metric_but_run_accepted() {
        let run = normalize(TestType::Rtt, &envelope(json!({"mean": "P1DT1S"}))).unwrap();
        assert!(run.metrics.is_empty());
    }

    #[test]
    fn test_duration_label() {
        let run = normalize(TestType::Throughput, &envelope(json!({"duration": "PT10S"}))).unwrap();
        assert_eq!(run.duration_s, Some(10.0));
        let run = normalize(TestType::Throughput, &envelope(json!({"duration": 5}))).unwrap();
        assert_eq!(run.duration_s, Some(5.0));
        let run = normalize(TestType::Throughput, &envelope(json!({}))).unwrap();
        assert_eq!(run.duration_s, None);
    }

    #[test]
    fn test_non_object_raw_kept_under_raw_key() {
        let run = normalize(TestType::Mtu, &envelope(json!([1, 2]))).unwrap();
        assert_eq!(run.aux["raw"], json!([1, 2]));
        assert_eq!(run.metrics[0].name, "mtu_result");
    }

    #[test]
    fn test_trace_aux_views() {
        let run = normalize(
            TestType::Trace,
            &envelope(json!({"paths": [[{"ip": "10.0.0.1", "rtt": "PT0.010S"}, {"ip": "10.0.0.2", "rtt": "PT0.020S"}]]})),
        )
        .unwrap();
        assert_eq!(run.metrics, vec![Metric::new("hop_count", 2.0, "count")]);
        assert_eq!(run.aux["hop_ips"], json!(["10.0.0.1", "10.0.0.2"]));
        assert_eq!(run.aux["hops_flat"][1]["idx"], 2);
        assert_eq!(run.aux["hops_flat"][1]["rtt_ms"], 20.0);
        assert_eq!(run.hops.len(), 2);
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(parse_timestamp("2024-01-02T03:04:05Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02T03:04:05"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02 03:04:05"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02T05:04:05+02:00"), Some(expected));
        assert!(parse_timestamp("2024-01-02").is_some());
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_bad_ts_falls_back_to_now() {
        let before = Utc::now();
        let run = normalize(TestType::Clock, &envelope(json!({})).with_ts("not a time")).unwrap();
        assert!(run.ts >= before);
    }
}
