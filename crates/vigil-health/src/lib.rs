//! # Vigil Health - Change Detection and Availability for Watched Services
//!
//! This crate holds the per-service semantics of a check cycle:
//!
//! - [`fetcher`]: The [`HealthFetcher`] boundary and the gateway client
//! - [`SnapshotDiff`]: Classifies properties as added, modified, removed or
//!   retained against the previous snapshot
//! - [`TransitionDecision`]: The alive/dead state machine
//! - [`CheckOutcome`]: Both of the above plus the state to persist
//!
//! ## Example
//!
//! ```rust
//! use chrono::Utc;
//! use vigil_health::{CheckOutcome, TickMode};
//! use vigil_types::{HealthSnapshot, MonitoredService, Property, PropertyMap};
//!
//! let service = MonitoredService::new("billing", "billing-api");
//!
//! let mut properties = PropertyMap::new();
//! properties.insert("depth".into(), Property::watched("Queue depth", 4i64));
//! let snapshot = HealthSnapshot::reachable(properties, 35);
//!
//! let outcome = CheckOutcome::evaluate(&service, &snapshot, TickMode::ChangeDriven, Utc::now());
//! assert!(outcome.decision.flipped);
//! assert!(outcome.diff.added.contains_key("depth"));
//! ```

pub mod availability;
pub mod check;
pub mod diff;
pub mod error;
pub mod fetcher;

// Re-export main types
pub use availability::{Availability, TickMode, TransitionDecision};
pub use check::CheckOutcome;
pub use diff::SnapshotDiff;
pub use error::{HealthError, HealthResult};
pub use fetcher::{
    FetcherFactory, GatewayClient, GatewayConfig, GatewayCredentials, HealthFetcher,
    ParsedHealth,
};
