//! Cycle report aggregation.
//!
//! Sections always appear in the same order, each titled with its element
//! count, and the report closes with a footer naming the host and how many
//! services were evaluated. Downstream readers depend on this shape.

use vigil_health::Availability;

use crate::render::ServiceRender;

/// Report sections in rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportSection {
    Online,
    Offline,
    Added,
    Modified,
    Removed,
}

impl ReportSection {
    pub const ALL: [ReportSection; 5] = [
        ReportSection::Online,
        ReportSection::Offline,
        ReportSection::Added,
        ReportSection::Modified,
        ReportSection::Removed,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ReportSection::Online => "Online",
            ReportSection::Offline => "Offline",
            ReportSection::Added => "Added properties",
            ReportSection::Modified => "Modified properties",
            ReportSection::Removed => "Removed properties",
        }
    }
}

/// Text blocks collected over one cycle.
#[derive(Debug, Clone, Default)]
pub struct Report {
    online: Vec<String>,
    offline: Vec<String>,
    added: Vec<String>,
    modified: Vec<String>,
    removed: Vec<String>,
    evaluated: usize,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record how many services this cycle evaluated.
    pub fn set_evaluated(&mut self, evaluated: usize) {
        self.evaluated = evaluated;
    }

    pub fn evaluated(&self) -> usize {
        self.evaluated
    }

    /// Sort one service's blocks into their sections.
    pub fn push(&mut self, render: ServiceRender) {
        if let Some(status) = render.status {
            match render.availability {
                Availability::Alive => self.online.push(status),
                Availability::Dead => self.offline.push(status),
            }
        }
        self.added.extend(render.added);
        self.modified.extend(render.modified);
        self.removed.extend(render.removed);
    }

    pub fn section(&self, section: ReportSection) -> &[String] {
        match section {
            ReportSection::Online => &self.online,
            ReportSection::Offline => &self.offline,
            ReportSection::Added => &self.added,
            ReportSection::Modified => &self.modified,
            ReportSection::Removed => &self.removed,
        }
    }

    /// True when no section has content; such a report is never sent.
    pub fn is_empty(&self) -> bool {
        ReportSection::ALL
            .iter()
            .all(|section| self.section(*section).is_empty())
    }

    /// Render the report text, or `None` if there is nothing to send.
    pub fn render(&self, host: &str) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let mut parts = Vec::new();
        for section in ReportSection::ALL {
            let blocks = self.section(section);
            if blocks.is_empty() {
                continue;
            }
            parts.push(format!(
                "{} ({})\n{}",
                section.title(),
                blocks.len(),
                blocks.join("\n\n")
            ));
        }
        parts.push(format!(
            "host: {} | services evaluated: {}",
            host, self.evaluated
        ));

        Some(parts.join("\n\n"))
    }
}
