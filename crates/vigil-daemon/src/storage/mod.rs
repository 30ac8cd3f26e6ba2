//! Storage layer for vigil-daemon
//!
//! Persists registered services together with their last snapshot and
//! availability state.

mod memory;
mod postgres;
mod traits;

pub use memory::InMemoryStorage;
pub use postgres::PostgresStorage;
pub use traits::{ServiceStorage, StorageResult};

use crate::config::ServiceSeed;
use tracing::info;
use vigil_types::MonitoredService;

/// Register configured services whose `source_id` is not yet stored.
///
/// Returns the number of services registered.
pub async fn seed_services(
    storage: &dyn ServiceStorage,
    seeds: &[ServiceSeed],
) -> StorageResult<usize> {
    let known = storage.list_services().await?;
    let mut registered = 0;

    for seed in seeds {
        if known.iter().any(|s| s.source_id == seed.source_id) {
            continue;
        }
        let service = MonitoredService::new(&seed.application_type, &seed.source_id);
        info!(
            service_id = %service.id,
            application = %seed.application_type,
            source_id = %seed.source_id,
            "Registering service"
        );
        storage.register_service(service).await?;
        registered += 1;
    }

    Ok(registered)
}
