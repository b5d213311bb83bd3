//! Data models
//!
//! Analysis payload types and patient identity.

mod analysis;
mod patient;

pub use analysis::{parse_calendar_date, AnalysisResult, HealthProfile, MetricRecord};
pub use patient::{resolve_patient, PatientId, PatientLink};
