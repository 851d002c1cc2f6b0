//! Wire-level measurement requests

use crate::normalize::normalize;
use crate::{Direction, MeasurementRun, TestType, ValidationError};
use serde::{Deserialize, Deserializer, Serialize};

/// One side of a measurement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Endpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Endpoint {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: Some(ip.into()),
            name: None,
        }
    }

    pub fn named(ip: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ip: Some(ip.into()),
            name: Some(name.into()),
        }
    }

    /// Non-empty IP, if any.
    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref().filter(|ip| !ip.is_empty())
    }

    /// Row label: the name when set, otherwise the IP.
    pub fn label(&self) -> String {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.ip.as_deref())
            .unwrap_or_default()
            .to_string()
    }
}

/// Common wrapper around a raw tool result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MeasurementEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<Endpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst: Option<Endpoint>,
    /// ISO-8601 timestamp; offset-less values are taken as UTC. Non-string
    /// JSON is treated as absent.
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_ts",
        skip_serializing_if = "Option::is_none"
    )]
    pub ts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    /// Tool output as delivered by pScheduler.
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub raw: serde_json::Value,
}

impl MeasurementEnvelope {
    pub fn new(src: Endpoint, dst: Endpoint, raw: serde_json::Value) -> Self {
        Self {
            src: Some(src),
            dst: Some(dst),
            raw,
            ..Default::default()
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_ts(mut self, ts: impl Into<String>) -> Self {
        self.ts = Some(ts.into());
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Caller-supplied run id when non-empty.
    pub fn supplied_run_id(&self) -> Option<&str> {
        self.run_id.as_deref().filter(|id| !id.is_empty())
    }
}

fn deserialize_lenient_ts<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(ts) => Some(ts),
        _ => None,
    })
}

/// A measurement of a specific test type, tagged by `test_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "test_type", rename_all = "lowercase")]
pub enum MeasurementRequest {
    Clock(MeasurementEnvelope),
    Latency(MeasurementEnvelope),
    Mtu(MeasurementEnvelope),
    Rtt(MeasurementEnvelope),
    Throughput(MeasurementEnvelope),
    Trace(MeasurementEnvelope),
}

impl MeasurementRequest {
    pub fn new(test_type: TestType, envelope: MeasurementEnvelope) -> Self {
        match test_type {
            TestType::Clock => MeasurementRequest::Clock(envelope),
            TestType::Latency => MeasurementRequest::Latency(envelope),
            TestType::Mtu => MeasurementRequest::Mtu(envelope),
            TestType::Rtt => MeasurementRequest::Rtt(envelope),
            TestType::Throughput => MeasurementRequest::Throughput(envelope),
            TestType::Trace => MeasurementRequest::Trace(envelope),
        }
    }

    pub fn test_type(&self) -> TestType {
        match self {
            MeasurementRequest::Clock(_) => TestType::Clock,
            MeasurementRequest::Latency(_) => TestType::Latency,
            MeasurementRequest::Mtu(_) => TestType::Mtu,
            MeasurementRequest::Rtt(_) => TestType::Rtt,
            MeasurementRequest::Throughput(_) => TestType::Throughput,
            MeasurementRequest::Trace(_) => TestType::Trace,
        }
    }

    pub fn envelope(&self) -> &MeasurementEnvelope {
        match self {
            MeasurementRequest::Clock(e)
            | MeasurementRequest::Latency(e)
            | MeasurementRequest::Mtu(e)
            | MeasurementRequest::Rtt(e)
            | MeasurementRequest::Throughput(e)
            | MeasurementRequest::Trace(e) => e,
        }
    }

    /// Decode one request from loose JSON, e.g. an item of a bulk body.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ValidationError> {
        serde_json::from_value(value).map_err(|e| ValidationError::InvalidValue {
            field: "measurement".to_string(),
            reason: e.to_string(),
        })
    }

    /// Convert into the canonical run for this test type.
    pub fn normalize(&self) -> Result<MeasurementRun, ValidationError> {
        normalize(self.test_type(), self.envelope())
    }
}
