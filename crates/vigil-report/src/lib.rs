//! Vigil Report - text rendering of check-cycle reports
//!
//! Each reportable service renders into up to four text blocks (status,
//! added, modified, removed). A [`Report`] collects the blocks of one cycle
//! into five fixed sections and renders them with a footer.

pub mod duration;
pub mod render;
pub mod report;

pub use duration::format_since;
pub use render::{ServiceRender, MARKER_ADDED, MARKER_MODIFIED, MARKER_REMOVED, MARKER_RETAINED};
pub use report::{Report, ReportSection};
