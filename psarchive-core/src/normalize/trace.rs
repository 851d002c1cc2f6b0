//! Traceroute results

use super::value::seconds;
use crate::{FlatHop, Metric};
use serde_json::Value;

/// Hops of the first path, accepting `[[hop, ..], ..]` and `[hop, ..]`.
fn first_path(raw: &Value) -> &[Value] {
    let Some(paths) = raw.get("paths").and_then(Value::as_array) else {
        return &[];
    };
    match paths.first() {
        Some(Value::Array(hops)) => hops.as_slice(),
        Some(Value::Object(_)) => paths.as_slice(),
        _ => &[],
    }
}

fn flatten(idx: usize, hop: &Value) -> FlatHop {
    FlatHop {
        idx: u32::try_from(idx).unwrap_or(u32::MAX),
        ip: hop.get("ip").and_then(Value::as_str).map(str::to_string),
        rtt_ms: hop
            .get("rtt")
            .and_then(seconds)
            .map(|s| s * 1000.0)
            .filter(|ms| ms.is_finite()),
    }
}

pub(super) fn extract(raw: &Value) -> (Vec<Metric>, Vec<FlatHop>) {
    let hops: Vec<FlatHop> = first_path(raw)
        .iter()
        .enumerate()
        .map(|(i, hop)| flatten(i + 1, hop))
        .collect();
    let metrics = vec![Metric::new("hop_count", hops.len() as f64, "count")];
    (metrics, hops)
}

/// IPs of hops that have one, in path order.
pub fn hop_ips(hops: &[FlatHop]) -> Vec<String> {
    hops.iter()
        .filter_map(|h| h.ip.as_deref())
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .collect()
}
