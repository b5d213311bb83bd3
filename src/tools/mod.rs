//! Insights tools module
//!
//! MCP tool implementations for health insights.

pub mod insights;
pub mod patients;
pub mod status;
