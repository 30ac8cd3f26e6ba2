//! Parsing of the gateway's aggregated health response.
//!
//! The gateway answers with one entry per requested resource:
//!
//! ```json
//! {
//!   "billing-api": {
//!     "success": true,
//!     "monitor": {
//!       "queueDepth": { "name": "Queue depth", "value": 4, "watchForChange": true }
//!     }
//!   }
//! }
//! ```
//!
//! Anything that does not match this shape is rejected.

use serde::Deserialize;
use vigil_types::{HealthSnapshot, PropertyMap};

use crate::error::{HealthError, HealthResult};

#[derive(Debug, Deserialize)]
struct ResourceEntry {
    success: bool,
    #[serde(default)]
    monitor: Option<PropertyMap>,
}

/// A validated resource entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedHealth {
    /// Upstream's own success flag.
    pub success: bool,

    /// Monitor-formatted properties, if exposed.
    pub properties: Option<PropertyMap>,
}

impl ParsedHealth {
    pub fn into_snapshot(self, response_time_ms: u64) -> HealthSnapshot {
        if !self.success {
            return HealthSnapshot::unreachable(response_time_ms);
        }
        match self.properties {
            Some(properties) => HealthSnapshot::reachable(properties, response_time_ms),
            None => HealthSnapshot::reachable_without_properties(response_time_ms),
        }
    }
}

/// Extract and validate `resource`'s entry from an aggregated response.
pub fn parse_resource(body: &serde_json::Value, resource: &str) -> HealthResult<ParsedHealth> {
    let entries = body.as_object().ok_or_else(|| HealthError::MalformedPayload {
        resource: resource.to_string(),
        reason: "gateway response is not an object".to_string(),
    })?;

    let entry = entries
        .get(resource)
        .ok_or_else(|| HealthError::UpstreamDataMissing(resource.to_string()))?;

    let entry = ResourceEntry::deserialize(entry).map_err(|e| HealthError::MalformedPayload {
        resource: resource.to_string(),
        reason: e.to_string(),
    })?;

    Ok(ParsedHealth {
        success: entry.success,
        properties: entry.monitor,
    })
}
