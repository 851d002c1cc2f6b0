//! Fuzz the `PT<seconds>S` duration grammar.
//!
//! Run with: cargo +nightly fuzz run duration_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use psarchive_core::duration::{format_seconds, parse_millis, parse_seconds};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    if let Some(secs) = parse_seconds(input) {
        assert!(secs.is_finite());
        assert!(input.starts_with("PT") && input.ends_with('S'));

        let reparsed = parse_seconds(&format_seconds(secs));
        assert_eq!(reparsed, Some(secs), "format/parse drifted for {:?}", input);
    }

    match (parse_seconds(input), parse_millis(input)) {
        (Some(s), Some(ms)) => assert_eq!(ms, s * 1000.0),
        (Some(s), None) => assert!(!(s * 1000.0).is_finite()),
        (None, None) => {}
        other => panic!("seconds/millis disagree on {:?}: {:?}", input, other),
    }
});
