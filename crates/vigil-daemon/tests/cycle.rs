//! End-to-end check cycles against in-memory storage.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use vigil_daemon::error::NotifyResult;
use vigil_daemon::storage::StorageResult;
use vigil_daemon::{
    InMemoryStorage, NotificationSink, NotifyError, Orchestrator, ServiceStorage, StorageError,
};
use vigil_health::{FetcherFactory, GatewayClient, GatewayConfig, HealthFetcher, TickMode};
use vigil_types::{
    HealthSnapshot, MonitoredService, Property, PropertyMap, ServiceId, ServiceStateUpdate,
};

#[derive(Default)]
struct RecordingSink {
    reports: Mutex<Vec<String>>,
    reject: bool,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, report: &str) -> NotifyResult<()> {
        self.reports.lock().await.push(report.to_string());
        if self.reject {
            return Err(NotifyError::Rejected {
                status: 502,
                body: "bad gateway".to_string(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Delegates to in-memory storage but fails state writes for one service.
struct FlakyStorage {
    inner: InMemoryStorage,
    failing: ServiceId,
}

#[async_trait]
impl ServiceStorage for FlakyStorage {
    async fn register_service(&self, service: MonitoredService) -> StorageResult<()> {
        self.inner.register_service(service).await
    }

    async fn get_service(&self, id: &ServiceId) -> StorageResult<Option<MonitoredService>> {
        self.inner.get_service(id).await
    }

    async fn list_services(&self) -> StorageResult<Vec<MonitoredService>> {
        self.inner.list_services().await
    }

    async fn list_active_services(&self) -> StorageResult<Vec<MonitoredService>> {
        self.inner.list_active_services().await
    }

    async fn update_service_state(
        &self,
        id: &ServiceId,
        update: ServiceStateUpdate,
    ) -> StorageResult<()> {
        if *id == self.failing {
            return Err(StorageError::Connection("connection reset".to_string()));
        }
        self.inner.update_service_state(id, update).await
    }

    async fn set_active(&self, id: &ServiceId, active: bool) -> StorageResult<()> {
        self.inner.set_active(id, active).await
    }
}

/// Fetcher answering from a fixed table keyed by `source_id`.
fn scripted(responses: HashMap<String, HealthSnapshot>) -> impl HealthFetcher {
    let responses = Arc::new(responses);
    FetcherFactory::from_fn("scripted", move |service: MonitoredService| {
        let responses = responses.clone();
        async move {
            responses
                .get(&service.source_id)
                .cloned()
                .unwrap_or_else(|| HealthSnapshot::unreachable(0))
        }
    })
}

fn settled(application_type: &str, source_id: &str, snapshot: Option<PropertyMap>) -> MonitoredService {
    let mut service = MonitoredService::new(application_type, source_id);
    service.is_alive = true;
    service.is_alive_transition_at = Utc::now() - Duration::days(3);
    service.last_notified_transition = true;
    service.last_snapshot = snapshot;
    service
}

fn props(entries: &[(&str, Property)]) -> PropertyMap {
    entries
        .iter()
        .map(|(key, property)| (key.to_string(), property.clone()))
        .collect()
}

#[tokio::test]
async fn test_recovery_reports_online_and_modified() {
    let transition_at = Utc::now() - Duration::hours(2);
    let mut service = MonitoredService::new("billing", "billing-api");
    service.is_alive = false;
    service.is_alive_transition_at = transition_at;
    service.last_notified_transition = true;
    service.last_snapshot = Some(props(&[
        ("count", Property::watched("Count", 3i64)),
        ("label", Property::informational("Label", "y")),
    ]));
    let id = service.id;

    let current = props(&[
        ("count", Property::watched("Count", 5i64)),
        ("label", Property::informational("Label", "x")),
    ]);
    let fetcher = scripted(HashMap::from([(
        "billing-api".to_string(),
        HealthSnapshot::reachable(current.clone(), 42),
    )]));

    let storage = Arc::new(InMemoryStorage::with_services([service]));
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Orchestrator::new(storage.clone(), Arc::new(fetcher), sink.clone(), "watch-01");

    let summary = orchestrator.run_cycle(TickMode::ChangeDriven).await.unwrap();
    assert_eq!(summary.reported, 1);
    assert!(summary.delivered);

    let reports = sink.reports.lock().await;
    assert_eq!(
        reports[0],
        "Online (1)\n\
         [billing]\n\
         since 2h\n\
         • Label: x\n\
         • Response time: 42ms\n\
         \n\
         Modified properties (1)\n\
         [billing]\n\
         ~ Count: 5\n\
         \n\
         host: watch-01 | services evaluated: 1"
    );

    let stored = storage.get_service(&id).await.unwrap().unwrap();
    assert!(stored.is_alive);
    assert!(stored.is_alive_transition_at > transition_at);
    assert!(stored.last_notified_transition);
    assert_eq!(stored.last_snapshot, Some(current));
}

#[tokio::test]
async fn test_unchanged_services_send_nothing() {
    let snapshot = props(&[("depth", Property::watched("Queue depth", 4i64))]);
    let services: Vec<_> = (0..5)
        .map(|i| settled(&format!("app-{}", i), &format!("app-{}-api", i), Some(snapshot.clone())))
        .collect();
    let responses = services
        .iter()
        .map(|s| (s.source_id.clone(), HealthSnapshot::reachable(snapshot.clone(), 20)))
        .collect();

    let storage = Arc::new(InMemoryStorage::with_services(services));
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Orchestrator::new(storage, Arc::new(scripted(responses)), sink.clone(), "watch-01");

    let summary = orchestrator.run_cycle(TickMode::ChangeDriven).await.unwrap();

    assert_eq!(summary.evaluated, 5);
    assert_eq!(summary.reported, 0);
    assert!(!summary.delivered);
    assert!(sink.reports.lock().await.is_empty());
}

#[tokio::test]
async fn test_periodic_reports_every_service() {
    let snapshot = props(&[("depth", Property::watched("Queue depth", 4i64))]);
    let up = settled("auth", "auth-api", Some(snapshot.clone()));
    let mut down = settled("search", "search-api", None);
    down.is_alive = false;

    let responses = HashMap::from([(
        "auth-api".to_string(),
        HealthSnapshot::reachable(snapshot, 15),
    )]);

    let storage = Arc::new(InMemoryStorage::with_services([up, down]));
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Orchestrator::new(storage, Arc::new(scripted(responses)), sink.clone(), "watch-01");

    let summary = orchestrator.run_cycle(TickMode::Periodic).await.unwrap();
    assert_eq!(summary.reported, 2);

    let reports = sink.reports.lock().await;
    let report = &reports[0];
    assert!(report.starts_with("Online (1)\n[auth]\nsince 3d\n• Queue depth: 4\n• Response time: 15ms"));
    assert!(report.contains("Offline (1)\n[search]\nsince 3d\n• Response time: 0ms"));
    assert!(!report.contains("Added properties"));
}

#[tokio::test]
async fn test_added_and_removed_properties() {
    let service = settled(
        "billing",
        "billing-api",
        Some(props(&[
            ("depth", Property::watched("Queue depth", 4i64)),
            ("legacy", Property::informational("Legacy", true)),
        ])),
    );
    let current = props(&[
        ("depth", Property::watched("Queue depth", 4i64)),
        ("workers", Property::watched("Workers", 8i64)),
    ]);
    let fetcher = scripted(HashMap::from([(
        "billing-api".to_string(),
        HealthSnapshot::reachable(current, 10),
    )]));

    let storage = Arc::new(InMemoryStorage::with_services([service]));
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Orchestrator::new(storage, Arc::new(fetcher), sink.clone(), "watch-01");

    orchestrator.run_cycle(TickMode::ChangeDriven).await.unwrap();

    let reports = sink.reports.lock().await;
    assert_eq!(
        reports[0],
        "Added properties (1)\n\
         [billing]\n\
         + Workers: 8\n\
         \n\
         Removed properties (1)\n\
         [billing]\n\
         - legacy\n\
         \n\
         host: watch-01 | services evaluated: 1"
    );
}

#[tokio::test]
async fn test_persist_failure_drops_only_that_service() {
    let healthy = MonitoredService::new("auth", "auth-api");
    let broken = MonitoredService::new("billing", "billing-api");
    let broken_id = broken.id;

    let responses = HashMap::from([
        ("auth-api".to_string(), HealthSnapshot::reachable_without_properties(8)),
        ("billing-api".to_string(), HealthSnapshot::reachable_without_properties(9)),
    ]);

    let storage = Arc::new(FlakyStorage {
        inner: InMemoryStorage::with_services([healthy, broken]),
        failing: broken_id,
    });
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Orchestrator::new(storage.clone(), Arc::new(scripted(responses)), sink.clone(), "watch-01");

    let summary = orchestrator.run_cycle(TickMode::ChangeDriven).await.unwrap();
    assert_eq!(summary.evaluated, 2);
    assert_eq!(summary.reported, 1);
    assert_eq!(summary.persist_failures, 1);

    let reports = sink.reports.lock().await;
    assert!(reports[0].contains("[auth]"));
    assert!(!reports[0].contains("[billing]"));
    assert!(reports[0].ends_with("services evaluated: 2"));

    let stored = storage.get_service(&broken_id).await.unwrap().unwrap();
    assert!(!stored.is_alive);
    assert!(!stored.last_notified_transition);
}

#[tokio::test]
async fn test_delivery_failure_keeps_state() {
    let service = MonitoredService::new("auth", "auth-api");
    let id = service.id;
    let responses = HashMap::from([(
        "auth-api".to_string(),
        HealthSnapshot::reachable_without_properties(8),
    )]);

    let storage = Arc::new(InMemoryStorage::with_services([service]));
    let sink = Arc::new(RecordingSink {
        reject: true,
        ..Default::default()
    });
    let orchestrator = Orchestrator::new(storage.clone(), Arc::new(scripted(responses)), sink.clone(), "watch-01");

    let summary = orchestrator.run_cycle(TickMode::ChangeDriven).await.unwrap();
    assert!(!summary.delivered);
    assert_eq!(sink.reports.lock().await.len(), 1);

    let stored = storage.get_service(&id).await.unwrap().unwrap();
    assert!(stored.is_alive);
    assert!(stored.last_notified_transition);
}

mod gateway {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_missing_gateway_entry_flips_to_offline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .and(query_param("resources", "billing-api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "search-api": {"success": true}
            })))
            .mount(&server)
            .await;

        let service = settled("billing", "billing-api", None);
        let id = service.id;
        let fetcher = GatewayClient::new(GatewayConfig {
            base_url: server.uri(),
            credentials: None,
            request_timeout: std::time::Duration::from_secs(2),
        })
        .unwrap();

        let storage = Arc::new(InMemoryStorage::with_services([service]));
        let sink = Arc::new(RecordingSink::default());
        let orchestrator = Orchestrator::new(storage.clone(), Arc::new(fetcher), sink.clone(), "watch-01");

        let summary = orchestrator.run_cycle(TickMode::ChangeDriven).await.unwrap();
        assert!(summary.delivered);

        let reports = sink.reports.lock().await;
        assert!(reports[0].starts_with("Offline (1)\n[billing]\nsince 3d\n• Response time: "));

        let stored = storage.get_service(&id).await.unwrap().unwrap();
        assert!(!stored.is_alive);
    }

    #[tokio::test]
    async fn test_gateway_monitor_payload_is_diffed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "billing-api": {
                    "success": true,
                    "monitor": {
                        "depth": {"name": "Queue depth", "value": 9, "watchForChange": true},
                        "version": {"name": "Version", "value": "1.4.2"}
                    }
                }
            })))
            .mount(&server)
            .await;

        let service = settled(
            "billing",
            "billing-api",
            Some(props(&[
                ("depth", Property::watched("Queue depth", 4i64)),
                ("version", Property::informational("Version", "1.4.1")),
            ])),
        );
        let fetcher = GatewayClient::new(GatewayConfig {
            base_url: server.uri(),
            credentials: None,
            request_timeout: std::time::Duration::from_secs(2),
        })
        .unwrap();

        let storage = Arc::new(InMemoryStorage::with_services([service]));
        let sink = Arc::new(RecordingSink::default());
        let orchestrator = Orchestrator::new(storage, Arc::new(fetcher), sink.clone(), "watch-01");

        orchestrator.run_cycle(TickMode::ChangeDriven).await.unwrap();

        let reports = sink.reports.lock().await;
        assert!(reports[0].starts_with("Modified properties (1)\n[billing]\n~ Queue depth: 9"));
        assert!(!reports[0].contains("Version"));
    }
}
