//! Health fetchers.
//!
//! A fetcher turns a registered service into a [`HealthSnapshot`]. It never
//! fails: transport errors, timeouts and malformed payloads all come back as
//! an unreachable snapshot carrying the measured latency.

mod gateway;
mod payload;

pub use gateway::{GatewayClient, GatewayConfig, GatewayCredentials};
pub use payload::{parse_resource, ParsedHealth};

use async_trait::async_trait;
use vigil_types::{HealthSnapshot, MonitoredService};

/// Trait for health fetchers.
#[async_trait]
pub trait HealthFetcher: Send + Sync {
    /// Fetch the current health of a service.
    async fn fetch(&self, service: &MonitoredService) -> HealthSnapshot;

    /// Fetcher name for logging.
    fn name(&self) -> &str {
        "fetcher"
    }
}

/// Factory for closure-backed fetchers.
pub struct FetcherFactory;

impl FetcherFactory {
    /// Build a fetcher from an async closure.
    pub fn from_fn<F, Fut>(name: impl Into<String>, fetch_fn: F) -> impl HealthFetcher
    where
        F: Fn(MonitoredService) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = HealthSnapshot> + Send + 'static,
    {
        ClosureFetcher {
            name: name.into(),
            fetch_fn,
        }
    }
}

/// Fetcher implementation using a closure.
struct ClosureFetcher<F> {
    name: String,
    fetch_fn: F,
}

#[async_trait]
impl<F, Fut> HealthFetcher for ClosureFetcher<F>
where
    F: Fn(MonitoredService) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = HealthSnapshot> + Send,
{
    async fn fetch(&self, service: &MonitoredService) -> HealthSnapshot {
        (self.fetch_fn)(service.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
