//! Vigil Daemon library
//!
//! This crate wires the health engine into a running watcher:
//! - Configuration layering
//! - Storage backends for registered services
//! - Notification sinks
//! - The check-cycle orchestrator and its scheduler

pub mod config;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod scheduler;
pub mod storage;

pub use config::DaemonConfig;
pub use error::{DaemonError, DaemonResult, NotifyError, StorageError};
pub use notify::{LogSink, NotificationSink, WebhookSink};
pub use orchestrator::{CycleSummary, Orchestrator};
pub use scheduler::Scheduler;
pub use storage::{InMemoryStorage, PostgresStorage, ServiceStorage};
