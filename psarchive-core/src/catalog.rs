//! Human-readable descriptions for known metric names

/// Static description table, sorted by metric name.
const METRIC_DESCRIPTIONS: &[(&str, &str)] = &[
    ("avg_latency", "Histogram-weighted one-way latency (ms), OWAMP/TWAMP"),
    ("clock_diff_ms", "Clock difference between local/remote (ms)"),
    ("clock_offset_s", "Remote clock offset (seconds)"),
    ("delay_ms", "One/two-way latency (OWAMP/TWAMP)"),
    ("hop_count", "Traceroute hop count"),
    ("jitter_ms", "Jitter (ms), IPDV or stddev depending on tool"),
    ("loss_pct", "Packet loss percentage"),
    ("max_rtt_ms", "Ping maximum round-trip time (ms)"),
    ("mean_rtt_ms", "Ping mean round-trip time (ms)"),
    ("min_rtt_ms", "Ping minimum round-trip time (ms)"),
    ("mtu_bytes", "Detected path MTU (bytes)"),
    ("mtu_result", "MTU test outcome without a measured size (1 = succeeded)"),
    ("retransmits", "TCP retransmissions observed by sender"),
    ("rtt_ms", "Ping round-trip time (ms)"),
    ("throughput_mbps", "Throughput (Megabits per second), iperf3/nuttcp/ethr"),
];

/// Look up the description for a metric name.
pub fn metric_description(name: &str) -> Option<&'static str> {
    METRIC_DESCRIPTIONS
        .binary_search_by(|(key, _)| key.cmp(&name))
        .ok()
        .map(|i| METRIC_DESCRIPTIONS[i].1)
}
