//! pScheduler clock results

use super::value::{duration_ms, number_at, path};
use crate::Metric;
use serde_json::Value;

pub(super) fn extract(raw: &Value) -> Vec<Metric> {
    let mut metrics = Vec::new();
    if let Some(diff_ms) = path(raw, &["difference"]).and_then(duration_ms) {
        metrics.push(Metric::new("clock_diff_ms", diff_ms, "ms"));
    }
    if let Some(offset_s) = number_at(raw, &["remote", "offset"]) {
        metrics.push(Metric::new("clock_offset_s", offset_s, "s"));
    }
    metrics
}
