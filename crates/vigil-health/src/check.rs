//! Per-service check evaluation.
//!
//! Combines a fresh [`HealthSnapshot`] with the stored service state into a
//! [`CheckOutcome`]: the classified diff, the availability decision, whether
//! the service belongs in this cycle's report, and the state to persist.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use vigil_types::{HealthSnapshot, MonitoredService, ServiceId, ServiceStateUpdate};

use crate::availability::{Availability, TickMode, TransitionDecision};
use crate::diff::SnapshotDiff;

/// Everything a cycle needs to persist and render one service.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub service_id: ServiceId,
    pub application_type: String,
    pub mode: TickMode,
    pub decision: TransitionDecision,
    pub diff: SnapshotDiff,
    pub update: ServiceStateUpdate,

    /// The stored snapshot was dropped because the service stopped
    /// exposing structured data.
    pub snapshot_cleared: bool,
}

impl CheckOutcome {
    /// Evaluate one fetch against the stored service state.
    pub fn evaluate(
        service: &MonitoredService,
        snapshot: &HealthSnapshot,
        mode: TickMode,
        now: DateTime<Utc>,
    ) -> Self {
        let decision = TransitionDecision::decide(
            service.is_alive,
            service.is_alive_transition_at,
            service.last_notified_transition,
            snapshot.reachable,
            now,
        );

        let response_time = snapshot.response_time_property();
        let (diff, last_snapshot) = match (&snapshot.properties, snapshot.reachable) {
            (Some(current), _) => (
                SnapshotDiff::compute(service.last_snapshot.as_ref(), current, response_time),
                Some(current.clone()),
            ),
            // Reachable without structured data: nothing left to compare against.
            (None, true) => (SnapshotDiff::without_properties(response_time), None),
            // Unreachable: keep the last successful snapshot for the next comparison.
            (None, false) => (
                SnapshotDiff::without_properties(response_time),
                service.last_snapshot.clone(),
            ),
        };

        debug!(
            service_id = %service.id,
            availability = %decision.availability,
            flipped = decision.flipped,
            added = diff.added.len(),
            modified = diff.modified.len(),
            removed = diff.removed.len(),
            "Evaluated check"
        );

        let snapshot_cleared = service.last_snapshot.is_some() && last_snapshot.is_none();

        let update = ServiceStateUpdate {
            is_alive: decision.availability.is_alive(),
            is_alive_transition_at: decision.transition_at,
            last_notified_transition: true,
            last_snapshot,
        };

        Self {
            service_id: service.id,
            application_type: service.application_type.clone(),
            mode,
            decision,
            diff,
            update,
            snapshot_cleared,
        }
    }

    /// Whether this service contributes to the cycle's report.
    pub fn is_reportable(&self) -> bool {
        self.mode == TickMode::Periodic || self.decision.is_reportable() || self.diff.has_changes()
    }

    /// Whether the stored state must be written back.
    pub fn needs_persist(&self) -> bool {
        self.is_reportable() || self.snapshot_cleared
    }

    /// Whether the availability block (online/offline) is rendered.
    pub fn announces_status(&self) -> bool {
        self.mode == TickMode::Periodic || self.decision.is_reportable()
    }

    pub fn availability(&self) -> Availability {
        self.decision.availability
    }

    pub fn since(&self) -> Duration {
        self.decision.since
    }
}
