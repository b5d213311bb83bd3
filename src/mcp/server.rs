//! Insights MCP Server Implementation
//!
//! Exposes the insights session, patient identity, and report export as
//! MCP tools.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};

use crate::client::AnalysisSource;
use crate::db::Database;
use crate::insights::InsightsSession;
use crate::tools::insights;
use crate::tools::patients;
use crate::tools::status::StatusTracker;

/// Insights MCP Service
#[derive(Clone)]
pub struct InsightsService {
    session: Arc<InsightsSession>,
    source: Arc<dyn AnalysisSource>,
    database: Database,
    report_dir: PathBuf,
    status_tracker: Arc<StatusTracker>,
    tool_router: ToolRouter<InsightsService>,
}

impl InsightsService {
    pub fn new(
        session: Arc<InsightsSession>,
        source: Arc<dyn AnalysisSource>,
        database: Database,
        report_dir: PathBuf,
        status_tracker: StatusTracker,
    ) -> Self {
        Self {
            session,
            source,
            database,
            report_dir,
            status_tracker: Arc::new(status_tracker),
            tool_router: Self::tool_router(),
        }
    }
}

// ============================================================================
// Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ResolvePatientParams {
    /// Authenticated user id
    pub user_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LinkPatientParams {
    pub user_id: String,
    pub patient_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LoadInsightsParams {
    /// Patient to analyze. Takes precedence over user_id.
    pub patient_id: Option<String>,
    /// Resolve the patient through this user's link
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExportInsightsReportParams {
    /// Directory to write the PDF into (defaults to the configured report directory)
    pub output_dir: Option<String>,
}

fn to_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl InsightsService {
    // --- Status ---

    #[tool(description = "Get the current status of the insights service including build info, session state, database status, and process information")]
    async fn insights_status(&self) -> Result<CallToolResult, McpError> {
        let status = self.status_tracker.get_status(&self.session.snapshot());
        to_json(&status)
    }

    // --- Patient Identity ---

    #[tool(description = "Resolve the patient id linked to an authenticated user. Returns null patient_id when no link exists.")]
    fn resolve_patient(&self, Parameters(p): Parameters<ResolvePatientParams>) -> Result<CallToolResult, McpError> {
        let result = patients::resolve_patient(&self.database, &p.user_id)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Link an authenticated user to their patient record, replacing any existing link")]
    fn link_patient(&self, Parameters(p): Parameters<LinkPatientParams>) -> Result<CallToolResult, McpError> {
        let result = patients::link_patient(&self.database, &p.user_id, &p.patient_id)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    // --- Insights ---

    #[tool(description = "Request a fresh AI health analysis for a patient (by patient_id, or by user_id through the patient link; with neither, reloads the last patient). Always fetches, even if a load is already running. Returns the resulting view.")]
    async fn load_insights(&self, Parameters(p): Parameters<LoadInsightsParams>) -> Result<CallToolResult, McpError> {
        let result = insights::load_insights(
            &self.database,
            &self.session,
            self.source.as_ref(),
            p.patient_id.as_deref(),
            p.user_id.as_deref(),
        )
        .await
        .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get the current insights view (screen, summary, profile, chart series, recommendations) without fetching")]
    fn get_insights(&self) -> Result<CallToolResult, McpError> {
        to_json(&insights::get_insights(&self.session))
    }

    #[tool(description = "Render the loaded insights report and save it as a single-page PDF named Health_Insights_Report_<date>.pdf")]
    async fn export_insights_report(
        &self,
        Parameters(p): Parameters<ExportInsightsReportParams>,
    ) -> Result<CallToolResult, McpError> {
        let output_dir = p
            .output_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| self.report_dir.clone());
        let result = insights::export_insights_report(&self.session, output_dir).await;
        to_json(&result)
    }
}

#[tool_handler]
impl ServerHandler for InsightsService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "health-insights".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Health Insights".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Health Insights - AI-generated analysis of a patient's medical records. \
                 Identity: resolve_patient/link_patient map an authenticated user to a patient id. \
                 Insights: load_insights fetches a fresh analysis (slow, LLM-backed); get_insights reads the current view. \
                 The view's screen is one of call_to_action, loading, report, empty_state, failed. \
                 Export: export_insights_report saves the rendered report as a PDF. \
                 Status: insights_status."
                    .into(),
            ),
        }
    }
}
