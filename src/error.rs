//! Error types
//!
//! Failures raised by the insights pipeline. Every variant carries a message
//! fit for display; none of them is fatal to the process.

use thiserror::Error;

use crate::db::DbError;

/// Generic message used when the analysis service reports failure without detail
pub const GENERIC_ANALYSIS_FAILURE: &str = "Failed to generate health insights";

#[derive(Debug, Error)]
pub enum InsightsError {
    /// Network or HTTP-level failure talking to the analysis service
    #[error("{message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// The analysis service answered but reported a failure
    #[error("{detail}")]
    Application { detail: String },

    /// Capturing or assembling the PDF report failed
    #[error("Report export failed: {0}")]
    Export(String),

    #[error("Invalid patient id: {0}")]
    InvalidPatientId(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

impl InsightsError {
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    pub fn application(detail: Option<String>) -> Self {
        let detail = detail
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| GENERIC_ANALYSIS_FAILURE.to_string());
        Self::Application { detail }
    }

    pub fn export(message: impl Into<String>) -> Self {
        Self::Export(message.into())
    }

    /// Short machine-readable label for responses and logs
    pub fn kind(&self) -> &'static str {
        match self {
            InsightsError::Transport { .. } => "transport",
            InsightsError::Application { .. } => "application",
            InsightsError::Export(_) => "export",
            InsightsError::InvalidPatientId(_) => "invalid_patient_id",
            InsightsError::Config(_) => "config",
            InsightsError::Database(_) => "database",
        }
    }
}

/// Result type for insights operations
pub type InsightsResult<T> = Result<T, InsightsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_uses_detail() {
        let err = InsightsError::application(Some("No records".to_string()));
        assert_eq!(err.to_string(), "No records");
        assert_eq!(err.kind(), "application");
    }

    #[test]
    fn test_application_falls_back_to_generic() {
        assert_eq!(
            InsightsError::application(None).to_string(),
            GENERIC_ANALYSIS_FAILURE
        );
        assert_eq!(
            InsightsError::application(Some("  ".to_string())).to_string(),
            GENERIC_ANALYSIS_FAILURE
        );
    }

    #[test]
    fn test_transport_displays_message() {
        let err = InsightsError::transport(Some(500), "AI returned malformed data.");
        assert_eq!(err.to_string(), "AI returned malformed data.");
    }
}
