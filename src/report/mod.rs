//! Report rendering and export
//!
//! The insights view routes a session snapshot to a screen and lays the
//! loaded analysis out as a drawable report; the exporter turns any drawable
//! surface into a single-page PDF.

pub mod backend;
pub mod exporter;
pub mod view;

pub use exporter::{export_report, report_file_name, save_report, ExportedReport, ReportSurface};
pub use view::{profile_fields, screen, wrap_text, InsightsView, Screen};
