//! Analysis service client
//!
//! Fetches the AI-generated health analysis for a patient. One request per
//! call: no retries, no caching. Retrying is a user decision made through the
//! session.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::build_info::BuildInfo;
use crate::config::InsightsConfig;
use crate::error::{InsightsError, InsightsResult};
use crate::models::{AnalysisResult, PatientId};

/// Anything that can produce an analysis for a patient
#[async_trait]
pub trait AnalysisSource: Send + Sync {
    async fn fetch_analysis(&self, patient_id: &PatientId) -> InsightsResult<AnalysisResult>;
}

/// Response envelope of `GET /analyze_health/{patient_id}`
#[derive(Debug, Deserialize)]
struct AnalysisEnvelope {
    #[serde(default)]
    success: bool,
    data: Option<AnalysisResult>,
    detail: Option<String>,
}

/// HTTP client for the analysis service
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    http_client: Client,
    base_url: Url,
}

impl AnalysisClient {
    pub fn new(base_url: &str, timeout: Duration) -> InsightsResult<Self> {
        let base_url = parse_base_url(base_url)?;

        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(BuildInfo::current().user_agent())
            .build()
            .map_err(|e| InsightsError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn from_config(config: &InsightsConfig) -> InsightsResult<Self> {
        Self::new(&config.api_base_url, config.request_timeout())
    }

    /// URL of the analysis endpoint for a patient; the id is one escaped segment
    pub fn endpoint(&self, patient_id: &PatientId) -> InsightsResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InsightsError::Config(format!("Base URL cannot carry a path: {}", self.base_url))
            })?;
            segments
                .pop_if_empty()
                .push("analyze_health")
                .push(patient_id.as_str());
        }
        Ok(url)
    }
}

#[async_trait]
impl AnalysisSource for AnalysisClient {
    async fn fetch_analysis(&self, patient_id: &PatientId) -> InsightsResult<AnalysisResult> {
        let url = self.endpoint(patient_id)?;
        debug!(%url, "Requesting health analysis");

        let response = self.http_client.get(url).send().await.map_err(|e| {
            InsightsError::transport(
                e.status().map(|s| s.as_u16()),
                format!("Analysis service unreachable: {}", e),
            )
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_detail(&body)
                .unwrap_or_else(|| format!("Analysis request failed: HTTP {}", status));
            warn!(status = status.as_u16(), %message, "Analysis service returned an error");
            return Err(InsightsError::transport(Some(status.as_u16()), message));
        }

        let envelope: AnalysisEnvelope = response.json().await.map_err(|e| {
            InsightsError::transport(
                Some(status.as_u16()),
                format!("Malformed analysis response: {}", e),
            )
        })?;

        if !envelope.success {
            return Err(InsightsError::application(envelope.detail));
        }

        envelope.data.ok_or_else(|| InsightsError::application(None))
    }
}

/// Parse an http(s) base URL with a host
pub(crate) fn parse_base_url(raw: &str) -> InsightsResult<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| InsightsError::Config(format!("Invalid analysis service URL '{}': {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(InsightsError::Config(format!(
                "Analysis service URL must be http or https, got '{}'",
                other
            )))
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(InsightsError::Config(format!(
            "Analysis service URL '{}' has no host",
            raw
        )));
    }

    Ok(url)
}

/// The service reports errors as `{"detail": ...}`; detail is usually a
/// string but validation errors carry a structured list.
fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Null | Value::String(_) => None,
        other => Some(other.to_string()),
    }
}
