//! One check cycle: fetch, evaluate, persist, render and deliver.

use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};
use vigil_health::{CheckOutcome, HealthFetcher, TickMode};
use vigil_report::{Report, ServiceRender};
use vigil_types::MonitoredService;

use crate::error::DaemonResult;
use crate::notify::NotificationSink;
use crate::storage::ServiceStorage;

/// What a single cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    pub mode: TickMode,
    /// Active services checked
    pub evaluated: usize,
    /// Services that contributed to the report
    pub reported: usize,
    /// Services dropped because their state could not be written
    pub persist_failures: usize,
    /// Services whose check task panicked
    pub panicked: usize,
    /// Whether a report reached the sink
    pub delivered: bool,
}

/// Per-service result of a cycle.
enum ServiceResult {
    Quiet,
    Reported(ServiceRender),
    PersistFailed,
}

/// Runs check cycles over every active service.
pub struct Orchestrator {
    storage: Arc<dyn ServiceStorage>,
    fetcher: Arc<dyn HealthFetcher>,
    sink: Arc<dyn NotificationSink>,
    host: String,
}

impl Orchestrator {
    pub fn new(
        storage: Arc<dyn ServiceStorage>,
        fetcher: Arc<dyn HealthFetcher>,
        sink: Arc<dyn NotificationSink>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            fetcher,
            sink,
            host: host.into(),
        }
    }

    /// Run one cycle. Only failing to load the service list is an error;
    /// per-service and delivery failures are logged and counted.
    #[instrument(skip(self), fields(fetcher = self.fetcher.name(), sink = self.sink.name()))]
    pub async fn run_cycle(&self, mode: TickMode) -> DaemonResult<CycleSummary> {
        let services = self.storage.list_active_services().await?;
        let evaluated = services.len();

        info!(services = evaluated, "Check cycle started");

        let mut checks = JoinSet::new();
        for (index, service) in services.into_iter().enumerate() {
            let storage = self.storage.clone();
            let fetcher = self.fetcher.clone();
            checks.spawn(async move {
                (index, Self::check_service(storage, fetcher, service, mode).await)
            });
        }

        // Slots keep the storage listing order for the report
        let mut results: Vec<Option<ServiceResult>> = (0..evaluated).map(|_| None).collect();
        let mut panicked = 0;
        while let Some(joined) = checks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => {
                    error!(error = %e, "Service check task panicked; omitting from report");
                    panicked += 1;
                }
            }
        }

        let mut report = Report::new();
        report.set_evaluated(evaluated);

        let mut reported = 0;
        let mut persist_failures = 0;
        for result in results.into_iter().flatten() {
            match result {
                ServiceResult::Quiet => {}
                ServiceResult::Reported(render) => {
                    reported += 1;
                    report.push(render);
                }
                ServiceResult::PersistFailed => persist_failures += 1,
            }
        }

        let delivered = match report.render(&self.host) {
            Some(text) => match self.sink.deliver(&text).await {
                Ok(()) => true,
                Err(e) => {
                    error!(error = %e, "Report delivery failed");
                    false
                }
            },
            None => false,
        };

        info!(
            evaluated,
            reported, persist_failures, panicked, delivered, "Check cycle finished"
        );

        Ok(CycleSummary {
            mode,
            evaluated,
            reported,
            persist_failures,
            panicked,
            delivered,
        })
    }

    #[instrument(
        skip(storage, fetcher, service),
        fields(service_id = %service.id, application = %service.application_type)
    )]
    async fn check_service(
        storage: Arc<dyn ServiceStorage>,
        fetcher: Arc<dyn HealthFetcher>,
        service: MonitoredService,
        mode: TickMode,
    ) -> ServiceResult {
        let snapshot = fetcher.fetch(&service).await;
        let outcome = CheckOutcome::evaluate(&service, &snapshot, mode, Utc::now());

        if outcome.decision.flipped {
            info!(
                availability = %outcome.availability(),
                "Service availability changed"
            );
        }

        if outcome.needs_persist() {
            if let Err(e) = storage
                .update_service_state(&service.id, outcome.update.clone())
                .await
            {
                warn!(error = %e, "Failed to persist service state; omitting from report");
                return ServiceResult::PersistFailed;
            }
        }

        match ServiceRender::from_outcome(&outcome) {
            Some(render) => ServiceResult::Reported(render),
            None => ServiceResult::Quiet,
        }
    }
}
