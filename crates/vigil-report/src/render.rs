//! Per-service text blocks.

use vigil_health::{Availability, CheckOutcome};
use vigil_types::Property;

use crate::duration::format_since;

/// Marks unchanged or informational properties.
pub const MARKER_RETAINED: &str = "•";
/// Marks newly reported properties.
pub const MARKER_ADDED: &str = "+";
/// Marks watched properties whose value changed.
pub const MARKER_MODIFIED: &str = "~";
/// Marks properties the service stopped reporting.
pub const MARKER_REMOVED: &str = "-";

/// Rendered text for one reportable service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRender {
    /// Availability after the check; selects online or offline.
    pub availability: Availability,

    /// Header, since-line and retained properties.
    pub status: Option<String>,

    pub added: Option<String>,
    pub modified: Option<String>,
    pub removed: Option<String>,
}

impl ServiceRender {
    /// Render an outcome, or `None` when it is not reportable this cycle.
    pub fn from_outcome(outcome: &CheckOutcome) -> Option<Self> {
        if !outcome.is_reportable() {
            return None;
        }

        let header = format!("[{}]", outcome.application_type);
        let diff = &outcome.diff;

        // Periodic blocks restate the current state, so they carry the
        // since-line as well
        let status = outcome.announces_status().then(|| {
            let mut lines = vec![
                header.clone(),
                format!("since {}", format_since(outcome.since())),
            ];
            lines.extend(
                diff.retained
                    .iter()
                    .map(|(_, property)| property_line(MARKER_RETAINED, property)),
            );
            lines.join("\n")
        });

        let added = block(
            &header,
            diff.added
                .values()
                .map(|property| property_line(MARKER_ADDED, property)),
        );
        let modified = block(
            &header,
            diff.modified
                .values()
                .map(|property| property_line(MARKER_MODIFIED, property)),
        );
        let removed = block(
            &header,
            diff.removed
                .iter()
                .map(|key| format!("{} {}", MARKER_REMOVED, key)),
        );

        Some(Self {
            availability: outcome.availability(),
            status,
            added,
            modified,
            removed,
        })
    }
}

fn property_line(marker: &str, property: &Property) -> String {
    format!("{} {}: {}", marker, property.name, property.display_value())
}

fn block(header: &str, lines: impl Iterator<Item = String>) -> Option<String> {
    let lines: Vec<String> = lines.collect();
    if lines.is_empty() {
        return None;
    }
    Some(format!("{}\n{}", header, lines.join("\n")))
}
