//! Enum types for psarchive runs and outcomes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// TEST TYPES
// ============================================================================

/// Kind of pScheduler test a run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    Clock,
    Latency,
    Mtu,
    Rtt,
    Throughput,
    Trace,
}

impl TestType {
    /// Every test type, in route order.
    pub const ALL: [TestType; 6] = [
        TestType::Clock,
        TestType::Latency,
        TestType::Mtu,
        TestType::Rtt,
        TestType::Throughput,
        TestType::Trace,
    ];

    /// Wire and database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Clock => "clock",
            TestType::Latency => "latency",
            TestType::Mtu => "mtu",
            TestType::Rtt => "rtt",
            TestType::Throughput => "throughput",
            TestType::Trace => "trace",
        }
    }

    /// Tool label stamped on every row of a run of this type.
    pub fn tool(&self) -> &'static str {
        match self {
            TestType::Clock => "pscheduler-clock",
            TestType::Latency => "owamp/twping",
            TestType::Mtu => "mtu",
            TestType::Rtt => "ping",
            TestType::Throughput => "iperf3/nuttcp/ethr",
            TestType::Trace => "traceroute",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TestType {
    type Err = TestTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TestType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| TestTypeParseError(s.to_string()))
    }
}

/// Error when parsing an unknown test type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestTypeParseError(pub String);

impl fmt::Display for TestTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid test type: {}", self.0)
    }
}

impl std::error::Error for TestTypeParseError {}

// ============================================================================
// RUN LABELS
// ============================================================================

/// Outcome label of a run as reported by the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Success,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Traffic direction relative to the scheduling host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
        }
    }
}

// ============================================================================
// WRITE MODES AND OUTCOMES
// ============================================================================

/// How an ingest treats rows whose key already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum UpsertMode {
    /// Insert new keys, overwrite non-key columns of existing keys.
    #[default]
    #[serde(rename = "merge")]
    Merge,
    /// Insert only new keys; existing keys are reported as a conflict.
    #[serde(rename = "strict")]
    StrictInsert,
}

impl UpsertMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertMode::Merge => "merge",
            UpsertMode::StrictInsert => "strict",
        }
    }
}

impl fmt::Display for UpsertMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classification of one run inside a bulk ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum BulkStatus {
    Ok,
    Conflict,
    Invalid,
    Error,
}

impl BulkStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, BulkStatus::Ok)
    }
}

/// Reachability of the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum DbStatus {
    Ok,
    Down,
}
