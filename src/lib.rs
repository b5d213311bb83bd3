//! Health Insights Library
//!
//! AI-generated health analysis for a patient: fetched from the analysis
//! service, normalized into a chartable series, held in a process-wide
//! session, and exported as a PDF report.

pub mod build_info;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod insights;
pub mod mcp;
pub mod models;
pub mod report;
pub mod tools;
