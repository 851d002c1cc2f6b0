//! ISO-8601 `PT<seconds>S` duration grammar
//!
//! pScheduler reports intervals such as `"PT0.012S"`. Only the seconds-only
//! form is understood; anything with days, hours or minutes is rejected.

use once_cell::sync::Lazy;
use regex::Regex;

static PT_SECONDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^PT(-?\d+(?:\.\d+)?)S$").expect("Invalid duration regex"));

/// Parse a `PT<number>S` string into seconds.
pub fn parse_seconds(input: &str) -> Option<f64> {
    let caps = PT_SECONDS.captures(input)?;
    let secs: f64 = caps.get(1)?.as_str().parse().ok()?;
    secs.is_finite().then_some(secs)
}

/// Parse a `PT<number>S` string into milliseconds.
pub fn parse_millis(input: &str) -> Option<f64> {
    parse_seconds(input)
        .map(|s| s * 1000.0)
        .filter(|ms| ms.is_finite())
}

/// Render seconds back into the `PT<number>S` form.
pub fn format_seconds(secs: f64) -> String {
    format!("PT{}S", secs)
}
