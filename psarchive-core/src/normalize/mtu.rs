//! Path MTU discovery results

use super::value::{number, path, truthy};
use crate::Metric;
use serde_json::Value;

pub(super) fn extract(raw: &Value) -> Vec<Metric> {
    let direct = raw.get("mtu");
    let candidate = if truthy(direct) {
        direct
    } else {
        path(raw, &["results", "mtu"])
    };

    match candidate.and_then(number) {
        Some(bytes) => vec![Metric::new("mtu_bytes", bytes, "bytes")],
        None => {
            let failed = raw.get("succeeded") == Some(&Value::Bool(false));
            let result = if failed { 0.0 } else { 1.0 };
            vec![Metric::new("mtu_result", result, "count")]
        }
    }
}
