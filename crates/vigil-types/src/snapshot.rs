//! Result of one health fetch

use crate::{Property, PropertyMap, PropertyValue};
use serde::{Deserialize, Serialize};

/// Key of the synthetic latency property appended to every check.
pub const RESPONSE_TIME_KEY: &str = "responseTime";

/// Outcome of fetching one service's health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// Transport succeeded and the upstream reported success
    pub reachable: bool,

    /// Structured properties, when the upstream exposes a monitor payload
    pub properties: Option<PropertyMap>,

    /// Wall-clock latency of the fetch
    pub response_time_ms: u64,
}

impl HealthSnapshot {
    /// Reachable service with a structured monitor payload.
    pub fn reachable(properties: PropertyMap, response_time_ms: u64) -> Self {
        Self {
            reachable: true,
            properties: Some(properties),
            response_time_ms,
        }
    }

    /// Reachable service that reports no structured health data.
    pub fn reachable_without_properties(response_time_ms: u64) -> Self {
        Self {
            reachable: true,
            properties: None,
            response_time_ms,
        }
    }

    /// Unreachable service.
    pub fn unreachable(response_time_ms: u64) -> Self {
        Self {
            reachable: false,
            properties: None,
            response_time_ms,
        }
    }

    /// The synthetic latency property for this fetch.
    pub fn response_time_property(&self) -> Property {
        Property {
            name: "Response time".to_string(),
            value: Some(PropertyValue::Text(format!("{}ms", self.response_time_ms))),
            watch_for_change: false,
        }
    }
}
