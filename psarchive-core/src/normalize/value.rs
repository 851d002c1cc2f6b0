//! Option-returning accessors over untyped tool output

use crate::duration;
use serde_json::Value;

/// Walk nested objects by key. Any non-object along the way yields `None`.
pub fn path<'a>(root: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(root, |node, key| node.as_object()?.get(*key))
}

/// Coerce a JSON number or numeric string to a finite `f64`.
///
/// Booleans, objects, arrays and null never coerce.
pub fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// `number` applied to a nested key path.
pub fn number_at(root: &Value, keys: &[&str]) -> Option<f64> {
    path(root, keys).and_then(number)
}

/// Milliseconds from a `PT<seconds>S` string.
pub fn duration_ms(value: &Value) -> Option<f64> {
    value.as_str().and_then(duration::parse_millis)
}

/// Seconds from either a `PT<seconds>S` string or a bare number of seconds.
pub fn seconds(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => duration::parse_seconds(s),
        Value::Number(_) => number(value),
        _ => None,
    }
}

/// Loose truthiness: present, non-null, non-false, non-zero and non-empty.
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}
