//! Ping round-trip results

use super::value::{duration_ms, number_at};
use crate::Metric;
use serde_json::Value;

const RTT_FIELDS: [(&str, &str); 3] = [
    ("mean", "mean_rtt_ms"),
    ("max", "max_rtt_ms"),
    ("min", "min_rtt_ms"),
];

pub(super) fn extract(raw: &Value) -> Vec<Metric> {
    let mut metrics: Vec<Metric> = RTT_FIELDS
        .iter()
        .filter_map(|(field, name)| {
            raw.get(*field)
                .and_then(duration_ms)
                .map(|ms| Metric::new(*name, ms, "ms"))
        })
        .collect();
    if let Some(loss) = number_at(raw, &["loss"]) {
        metrics.push(Metric::new("loss_pct", loss, "pct"));
    }
    metrics
}
