//! Storage trait definitions

use crate::error::StorageError;
use async_trait::async_trait;
use vigil_types::{MonitoredService, ServiceId, ServiceStateUpdate};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage for watched services
#[async_trait]
pub trait ServiceStorage: Send + Sync {
    /// Register a new service; fails with `Conflict` if the id exists
    async fn register_service(&self, service: MonitoredService) -> StorageResult<()>;

    /// Get a service by ID
    async fn get_service(&self, id: &ServiceId) -> StorageResult<Option<MonitoredService>>;

    /// List all services
    async fn list_services(&self) -> StorageResult<Vec<MonitoredService>>;

    /// List services taking part in check cycles
    async fn list_active_services(&self) -> StorageResult<Vec<MonitoredService>>;

    /// Write the state produced by one check
    async fn update_service_state(
        &self,
        id: &ServiceId,
        update: ServiceStateUpdate,
    ) -> StorageResult<()>;

    /// Activate or deactivate a service
    async fn set_active(&self, id: &ServiceId, active: bool) -> StorageResult<()>;
}
