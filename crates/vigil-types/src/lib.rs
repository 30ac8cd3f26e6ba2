//! Vigil Types - Core types for service health watching
//!
//! Vigil checks registered services through a gateway, diffs the structured
//! health properties each one reports against the previous check, and
//! reports availability transitions and property changes.
//!
//! ## Key Concepts
//!
//! - **MonitoredService**: A registered target plus its persisted watch state
//! - **Property**: One named health attribute with a watch-for-change flag
//! - **PropertyValue**: Closed set of value shapes with structural equality
//! - **HealthSnapshot**: The result of one fetch for one service

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod ids;
pub mod property;
pub mod service;
pub mod snapshot;

// Re-export main types
pub use ids::ServiceId;
pub use property::{Property, PropertyMap, PropertyValue};
pub use service::{MonitoredService, ServiceStateUpdate};
pub use snapshot::{HealthSnapshot, RESPONSE_TIME_KEY};
