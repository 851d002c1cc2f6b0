//! OWAMP/TWAMP latency histograms

use super::value::number;
use crate::Metric;
use serde_json::Value;

pub(super) fn extract(raw: &Value) -> Vec<Metric> {
    raw.get("histogram-latency")
        .and_then(Value::as_object)
        .and_then(|hist| weighted_mean(hist.iter().map(|(bucket, count)| (bucket.as_str(), count))))
        .map(|avg| vec![Metric::new("avg_latency", avg, "ms")])
        .unwrap_or_default()
}

/// Count-weighted mean of bucket values. Any unparseable bucket or count
/// poisons the whole histogram; a zero total has no mean.
fn weighted_mean<'a>(buckets: impl Iterator<Item = (&'a str, &'a Value)>) -> Option<f64> {
    let mut weighted = 0.0;
    let mut total = 0.0;
    for (bucket, count) in buckets {
        let bucket: f64 = bucket.trim().parse().ok().filter(|b: &f64| b.is_finite())?;
        let count = number(count)?;
        weighted += bucket * count;
        total += count;
    }
    if total == 0.0 {
        return None;
    }
    let avg = weighted / total;
    avg.is_finite().then_some(avg)
}
