//! Health insights tools
//!
//! Load the analysis into the session, read it back as a view model, and
//! export the rendered report as a PDF.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::client::AnalysisSource;
use crate::db::Database;
use crate::error::InsightsError;
use crate::insights::{project, InsightsSession, LoadOutcome, NormalizedSeries, SeriesSpec, SessionSnapshot, SessionState};
use crate::models::{resolve_patient, PatientId};
use crate::report::{export_report, profile_fields, save_report, screen, InsightsView, Screen};

#[derive(Debug, Serialize)]
pub struct ProfileField {
    pub label: &'static str,
    pub value: String,
}

/// Everything the report screen shows
#[derive(Debug, Serialize)]
pub struct ReportContent {
    pub summary: String,
    pub profile: Vec<ProfileField>,
    pub chart: Vec<SeriesSpec>,
    /// First and last dates of the charted series
    pub period: Option<(String, String)>,
    pub series: NormalizedSeries,
    pub tips: Vec<String>,
}

/// Session snapshot routed to a screen
#[derive(Debug, Serialize)]
pub struct InsightsViewModel {
    #[serde(flatten)]
    pub screen: Screen,
    pub state: &'static str,
    pub has_loaded_once: bool,
    pub patient_id: Option<PatientId>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReportContent>,
}

impl InsightsViewModel {
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        let report = match &snapshot.state {
            SessionState::Ready { data, series } => Some((data, series.clone())),
            SessionState::Empty { data } => Some((data, NormalizedSeries::default())),
            _ => None,
        }
        .map(|(data, series)| ReportContent {
            summary: data.summary.clone(),
            profile: profile_fields(data.profile.as_ref())
                .into_iter()
                .map(|(label, value)| ProfileField { label, value })
                .collect(),
            chart: if series.is_empty() {
                Vec::new()
            } else {
                project(&series, data.active_metric_keys().unwrap_or(&[]))
            },
            period: series
                .date_range()
                .map(|(first, last)| (first.to_string(), last.to_string())),
            series,
            tips: data.tips.clone(),
        });

        Self {
            screen: screen(snapshot),
            state: snapshot.state.label(),
            has_loaded_once: snapshot.has_loaded_once,
            patient_id: snapshot.patient_id.clone(),
            updated_at: snapshot.updated_at,
            report,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoadInsightsResponse {
    /// False when the load ended in the error state
    pub success: bool,
    pub outcome: LoadOutcome,
    pub view: InsightsViewModel,
}

#[derive(Debug, Serialize)]
pub struct ExportReportResponse {
    pub success: bool,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub size_bytes: Option<usize>,
    pub page_height_mm: Option<f32>,
    pub message: Option<String>,
    /// `InsightsError::kind` of the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
}

impl ExportReportResponse {
    fn failed(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            file_path: None,
            file_name: None,
            size_bytes: None,
            page_height_mm: None,
            message: Some(message.into()),
            error_kind: Some(kind),
        }
    }
}

/// Pick the patient to load: explicit id, then the user's link, then the
/// patient of the previous load.
pub fn select_patient(
    db: &Database,
    session: &InsightsSession,
    patient_id: Option<&str>,
    user_id: Option<&str>,
) -> Result<PatientId, String> {
    if let Some(raw) = patient_id {
        return PatientId::parse(raw).map_err(|e| e.to_string());
    }

    if let Some(user_id) = user_id.map(str::trim).filter(|u| !u.is_empty()) {
        return db
            .with_conn(|conn| resolve_patient(conn, user_id))
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("No patient linked to user '{}'", user_id));
    }

    session
        .snapshot()
        .patient_id
        .ok_or_else(|| "Provide patient_id or user_id".to_string())
}

pub async fn load_insights(
    db: &Database,
    session: &InsightsSession,
    source: &dyn AnalysisSource,
    patient_id: Option<&str>,
    user_id: Option<&str>,
) -> Result<LoadInsightsResponse, String> {
    let patient_id = select_patient(db, session, patient_id, user_id)?;
    let (outcome, snapshot) = session.request_load(source, patient_id).await;

    Ok(LoadInsightsResponse {
        success: !matches!(snapshot.state, SessionState::Error { .. }),
        outcome,
        view: InsightsViewModel::from_snapshot(&snapshot),
    })
}

pub fn get_insights(session: &InsightsSession) -> InsightsViewModel {
    InsightsViewModel::from_snapshot(&session.snapshot())
}

/// Render the loaded report and save it as a PDF. Failures are reported in
/// the response; the session is never touched.
pub async fn export_insights_report(session: &InsightsSession, output_dir: PathBuf) -> ExportReportResponse {
    let snapshot = session.snapshot();
    let generated_on = chrono::Local::now().date_naive();

    let task = tokio::task::spawn_blocking(move || {
        let view = InsightsView::from_snapshot(&snapshot, generated_on)?;
        let report = export_report(&view, generated_on)?;
        let path = save_report(&report, &output_dir)?;
        Ok::<_, InsightsError>((report, path))
    });

    match task.await {
        Ok(Ok((report, path))) => {
            info!(path = %path.display(), "Insights report saved");
            ExportReportResponse {
                success: true,
                file_path: Some(path.display().to_string()),
                file_name: Some(report.file_name),
                size_bytes: Some(report.bytes.len()),
                page_height_mm: Some(report.page_height_mm),
                message: None,
                error_kind: None,
            }
        }
        Ok(Err(e)) => {
            warn!(kind = e.kind(), error = %e, "Insights report export failed");
            ExportReportResponse::failed(e.kind(), e.to_string())
        }
        Err(e) => {
            let err = InsightsError::export(e.to_string());
            warn!(kind = err.kind(), error = %err, "Insights report export task failed");
            ExportReportResponse::failed(err.kind(), err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InsightsResult;
    use crate::models::{AnalysisResult, MetricRecord, PatientLink};
    use crate::tools::patients::tests::test_db;
    use async_trait::async_trait;

    struct StubSource(Result<AnalysisResult, String>);

    #[async_trait]
    impl AnalysisSource for StubSource {
        async fn fetch_analysis(&self, _patient_id: &PatientId) -> InsightsResult<AnalysisResult> {
            self.0
                .clone()
                .map_err(|detail| InsightsError::application(Some(detail)))
        }
    }

    fn analysis() -> AnalysisResult {
        AnalysisResult {
            summary: "Stable".to_string(),
            available_metrics: Some(vec!["Weight".to_string()]),
            metrics: vec![
                MetricRecord::new("2024-02-01").with("Weight", Some(74.0)),
                MetricRecord::new("2024-01-01").with("Weight", Some(75.0)),
            ],
            tips: vec!["Walk daily".to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_load_by_patient_id_reaches_report() {
        let (_dir, db) = test_db();
        let session = InsightsSession::new();

        let response = load_insights(&db, &session, &StubSource(Ok(analysis())), Some("p-1"), None)
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.view.screen, Screen::Report);
        let report = response.view.report.unwrap();
        assert_eq!(report.series.records()[0].date, "2024-01-01");
        assert_eq!(report.period, Some(("2024-01-01".to_string(), "2024-02-01".to_string())));
        assert_eq!(report.chart[0].color.hex(), "#8884d8");
        assert_eq!(report.profile[4].value, "None reported");
    }

    #[tokio::test]
    async fn test_load_resolves_user_link() {
        let (_dir, db) = test_db();
        db.with_conn(|conn| PatientLink::link(conn, "user-1", &PatientId::parse("p-9").unwrap()))
            .unwrap();
        let session = InsightsSession::new();

        let response = load_insights(&db, &session, &StubSource(Ok(analysis())), None, Some("user-1"))
            .await
            .unwrap();
        assert_eq!(response.view.patient_id.unwrap().as_str(), "p-9");
    }

    #[tokio::test]
    async fn test_unlinked_user_is_rejected_before_loading() {
        let (_dir, db) = test_db();
        let session = InsightsSession::new();

        let err = load_insights(&db, &session, &StubSource(Ok(analysis())), None, Some("nobody"))
            .await
            .unwrap_err();
        assert!(err.contains("nobody"));
        assert_eq!(session.snapshot().state, SessionState::Idle);
    }

    #[tokio::test]
    async fn test_retry_reuses_previous_patient() {
        let (_dir, db) = test_db();
        let session = InsightsSession::new();

        let failed = load_insights(&db, &session, &StubSource(Err("X".to_string())), Some("p-1"), None)
            .await
            .unwrap();
        assert!(!failed.success);
        assert_eq!(failed.view.screen, Screen::CallToAction { error: Some("X".to_string()) });

        let retried = load_insights(&db, &session, &StubSource(Ok(analysis())), None, None)
            .await
            .unwrap();
        assert!(retried.success);
        assert_eq!(retried.view.patient_id.unwrap().as_str(), "p-1");
    }

    #[test]
    fn test_view_model_json_shape() {
        let session = InsightsSession::new();
        let value = serde_json::to_value(get_insights(&session)).unwrap();
        assert_eq!(value["screen"], "call_to_action");
        assert_eq!(value["state"], "idle");
        assert_eq!(value["has_loaded_once"], false);
        assert!(value.get("report").is_none());
    }

    #[tokio::test]
    async fn test_export_without_data_fails_gracefully() {
        let session = InsightsSession::new();
        let dir = tempfile::tempdir().unwrap();

        let response = export_insights_report(&session, dir.path().to_path_buf()).await;
        assert!(!response.success);
        assert_eq!(response.error_kind, Some("export"));
        assert!(response.message.unwrap().contains("no insights loaded"));
        assert_eq!(session.snapshot().state, SessionState::Idle);
    }

    #[tokio::test]
    async fn test_export_writes_pdf_for_loaded_report() {
        let (_dir, db) = test_db();
        let session = InsightsSession::new();
        let raw = AnalysisResult {
            available_metrics: Some(vec!["Systolic BP".to_string(), "Diastolic BP".to_string()]),
            metrics: vec![
                MetricRecord::new("2024-01-01")
                    .with("Systolic BP", Some(135.0))
                    .with("Diastolic BP", Some(88.0)),
                MetricRecord::new("2024-02-01")
                    .with("Systolic BP", Some(128.0))
                    .with("Diastolic BP", None),
                MetricRecord::new("2024-03-01")
                    .with("Systolic BP", Some(122.0))
                    .with("Diastolic BP", Some(80.0)),
            ],
            ..analysis()
        };
        load_insights(&db, &session, &StubSource(Ok(raw)), Some("p-1"), None)
            .await
            .unwrap();

        let out = tempfile::tempdir().unwrap();
        let response = export_insights_report(&session, out.path().join("reports")).await;

        assert!(response.success, "export failed: {:?}", response.message);
        assert!(response.error_kind.is_none());
        let path = PathBuf::from(response.file_path.unwrap());
        assert!(path.starts_with(out.path()));
        assert_eq!(path.file_name().unwrap().to_str(), response.file_name.as_deref());

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(Some(bytes.len()), response.size_bytes);
        assert!(response.page_height_mm.unwrap() > 0.0);
        assert_eq!(session.snapshot().state.label(), "ready");
    }
}
