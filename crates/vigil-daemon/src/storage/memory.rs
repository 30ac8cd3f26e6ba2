//! In-memory storage implementation

use super::traits::*;
use crate::error::StorageError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use vigil_types::{MonitoredService, ServiceId, ServiceStateUpdate};

/// In-memory storage for development and testing
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    services: Arc<RwLock<HashMap<ServiceId, MonitoredService>>>,
}

impl InMemoryStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage seeded with the given services
    pub fn with_services(services: impl IntoIterator<Item = MonitoredService>) -> Self {
        let map = services.into_iter().map(|s| (s.id, s)).collect();
        Self {
            services: Arc::new(RwLock::new(map)),
        }
    }
}

fn sorted(mut services: Vec<MonitoredService>) -> Vec<MonitoredService> {
    services.sort_by(|a, b| {
        a.application_type
            .cmp(&b.application_type)
            .then_with(|| a.id.cmp(&b.id))
    });
    services
}

#[async_trait]
impl ServiceStorage for InMemoryStorage {
    async fn register_service(&self, service: MonitoredService) -> StorageResult<()> {
        let mut services = self.services.write().await;
        if services.contains_key(&service.id) {
            return Err(StorageError::Conflict(service.id.to_string()));
        }
        services.insert(service.id, service);
        Ok(())
    }

    async fn get_service(&self, id: &ServiceId) -> StorageResult<Option<MonitoredService>> {
        let services = self.services.read().await;
        Ok(services.get(id).cloned())
    }

    async fn list_services(&self) -> StorageResult<Vec<MonitoredService>> {
        let services = self.services.read().await;
        Ok(sorted(services.values().cloned().collect()))
    }

    async fn list_active_services(&self) -> StorageResult<Vec<MonitoredService>> {
        let services = self.services.read().await;
        Ok(sorted(
            services.values().filter(|s| s.is_active).cloned().collect(),
        ))
    }

    async fn update_service_state(
        &self,
        id: &ServiceId,
        update: ServiceStateUpdate,
    ) -> StorageResult<()> {
        let mut services = self.services.write().await;
        let service = services
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        service.apply(update);
        Ok(())
    }

    async fn set_active(&self, id: &ServiceId, active: bool) -> StorageResult<()> {
        let mut services = self.services.write().await;
        let service = services
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        service.is_active = active;
        Ok(())
    }
}
