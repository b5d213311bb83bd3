//! Insights Status Tool
//!
//! Provides runtime status information about the insights service.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::insights::SessionSnapshot;

/// Runtime status of the insights service
#[derive(Debug, Clone, Serialize)]
pub struct InsightsStatus {
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,
    pub build_profile: &'static str,

    pub api_base_url: String,

    pub database_path: String,
    pub database_size_bytes: Option<u64>,

    /// Session lifecycle
    pub session_state: &'static str,
    pub has_loaded_once: bool,
    pub patient_id: Option<String>,

    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
    api_base_url: String,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf, api_base_url: impl Into<String>) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
            api_base_url: api_base_url.into(),
        }
    }

    pub fn get_status(&self, session: &SessionSnapshot) -> InsightsStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        InsightsStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            build_profile: build_info.profile,
            api_base_url: self.api_base_url.clone(),
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            session_state: session.state.label(),
            has_loaded_once: session.has_loaded_once,
            patient_id: session.patient_id.as_ref().map(|p| p.to_string()),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::InsightsSession;

    #[test]
    fn test_status_reports_session_and_process() {
        let tracker = StatusTracker::new(PathBuf::from("/nonexistent/insights.db"), "http://localhost:8000");
        let status = tracker.get_status(&InsightsSession::new().snapshot());

        assert_eq!(status.session_state, "idle");
        assert!(!status.has_loaded_once);
        assert_eq!(status.process_id, std::process::id());
        assert!(status.database_size_bytes.is_none());
        assert_eq!(status.api_base_url, "http://localhost:8000");
    }
}
