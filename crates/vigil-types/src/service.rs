//! Registered services and their persisted watch state

use crate::{PropertyMap, ServiceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered watch target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoredService {
    /// Unique service identifier
    pub id: ServiceId,

    /// Display label used as the report header
    pub application_type: String,

    /// Upstream resource name queried through the gateway
    pub source_id: String,

    /// Last known availability
    pub is_alive: bool,

    /// Instant of the last alive/dead flip
    pub is_alive_transition_at: DateTime<Utc>,

    /// Whether the current availability state has been reported once
    pub last_notified_transition: bool,

    /// Properties observed on the previous successful check
    pub last_snapshot: Option<PropertyMap>,

    /// Whether the service participates in checks
    pub is_active: bool,
}

impl MonitoredService {
    /// A freshly registered service.
    ///
    /// It starts dead with an unannounced state so the first check always
    /// reports it.
    pub fn new(application_type: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            id: ServiceId::generate(),
            application_type: application_type.into(),
            source_id: source_id.into(),
            is_alive: false,
            is_alive_transition_at: Utc::now(),
            last_notified_transition: false,
            last_snapshot: None,
            is_active: true,
        }
    }

    /// Apply a state update computed by a check.
    pub fn apply(&mut self, update: ServiceStateUpdate) {
        self.is_alive = update.is_alive;
        self.is_alive_transition_at = update.is_alive_transition_at;
        self.last_notified_transition = update.last_notified_transition;
        self.last_snapshot = update.last_snapshot;
    }
}

/// The mutable part of a service written back after a check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStateUpdate {
    pub is_alive: bool,
    pub is_alive_transition_at: DateTime<Utc>,
    pub last_notified_transition: bool,
    pub last_snapshot: Option<PropertyMap>,
}
