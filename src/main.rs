//! Health Insights
//!
//! An MCP server exposing AI-generated health insights and PDF reports.

use std::sync::Arc;

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

use health_insights::build_info;
use health_insights::client::{AnalysisClient, AnalysisSource};
use health_insights::config::InsightsConfig;
use health_insights::db::Database;
use health_insights::insights::InsightsSession;
use health_insights::mcp::InsightsService;
use health_insights::tools::status::StatusTracker;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (output to stderr to not interfere with MCP stdio)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("health_insights=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = InsightsConfig::from_env()?;
    build_info::print_startup_banner(&config);
    eprintln!("Starting MCP server on stdio...");

    let database = Database::open(&config.database_path)?;

    let source: Arc<dyn AnalysisSource> = Arc::new(AnalysisClient::from_config(&config)?);
    let session = Arc::new(InsightsSession::new());
    let status_tracker = StatusTracker::new(config.database_path.clone(), config.api_base_url.clone());

    let service = InsightsService::new(
        session,
        source,
        database,
        config.report_dir.clone(),
        status_tracker,
    );

    // Create stdio transport
    let transport = (stdin(), stdout());

    let server = service.serve(transport).await?;
    server.waiting().await?;

    Ok(())
}
