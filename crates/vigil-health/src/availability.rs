//! Availability state machine.
//!
//! Two states, alive and dead. A check flips the state when reachability
//! disagrees with the stored flag; an unannounced state stays reportable
//! until a report acknowledges it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Availability of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Availability {
    Alive,
    Dead,
}

impl Availability {
    pub fn from_alive(is_alive: bool) -> Self {
        if is_alive {
            Availability::Alive
        } else {
            Availability::Dead
        }
    }

    pub fn is_alive(self) -> bool {
        matches!(self, Availability::Alive)
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Availability::Alive => write!(f, "alive"),
            Availability::Dead => write!(f, "dead"),
        }
    }
}

/// Kind of check cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickMode {
    /// Report only services with a transition, pending announcement or
    /// property change.
    ChangeDriven,

    /// Report every active service regardless of change.
    Periodic,
}

impl std::fmt::Display for TickMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TickMode::ChangeDriven => write!(f, "change-driven"),
            TickMode::Periodic => write!(f, "periodic"),
        }
    }
}

/// Result of applying one reachability observation to stored state.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionDecision {
    /// Availability after this check.
    pub availability: Availability,

    /// Whether the stored flag flipped.
    pub flipped: bool,

    /// State was unchanged but had never been announced.
    pub pending_announcement: bool,

    /// Transition instant to persist.
    pub transition_at: DateTime<Utc>,

    /// Time between the stored transition instant and now.
    pub since: Duration,
}

impl TransitionDecision {
    /// Decide the new availability.
    ///
    /// `since` is measured from the instant stored before this check, so a
    /// flip reports how long the previous state lasted.
    pub fn decide(
        stored_is_alive: bool,
        stored_transition_at: DateTime<Utc>,
        last_notified_transition: bool,
        reachable: bool,
        now: DateTime<Utc>,
    ) -> Self {
        let flipped = reachable != stored_is_alive;

        Self {
            availability: Availability::from_alive(reachable),
            flipped,
            pending_announcement: !flipped && !last_notified_transition,
            transition_at: if flipped { now } else { stored_transition_at },
            since: now - stored_transition_at,
        }
    }

    /// Reportable from availability alone.
    pub fn is_reportable(&self) -> bool {
        self.flipped || self.pending_announcement
    }
}
