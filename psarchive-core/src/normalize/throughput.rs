//! iperf3/nuttcp/ethr throughput results

use super::value::number_at;
use crate::Metric;
use serde_json::Value;

const BITS_PER_SECOND: [&[&str]; 3] = [
    &["end", "sum_received", "bits_per_second"],
    &["summary", "summary", "throughput-bits"],
    &["summary", "summary", "throughput_bits"],
];

const RETRANSMITS: [&[&str]; 2] = [
    &["end", "sum_sent", "retransmits"],
    &["summary", "summary", "retransmits"],
];

fn first_number(raw: &Value, candidates: &[&[&str]]) -> Option<f64> {
    candidates.iter().find_map(|keys| number_at(raw, keys))
}

pub(super) fn extract(raw: &Value) -> Vec<Metric> {
    let mut metrics = Vec::new();
    if let Some(bits) = first_number(raw, &BITS_PER_SECOND) {
        metrics.push(Metric::new("throughput_mbps", bits / 1e6, "mbps"));
    }
    if let Some(retransmits) = first_number(raw, &RETRANSMITS) {
        metrics.push(Metric::new("retransmits", retransmits, "count"));
    }
    metrics
}
