//! Build and runtime identity
//!
//! What was built (counter, time, profile) and what it is talking to, for the
//! startup banner, the HTTP user agent and the status tool.

use serde::Serialize;

use crate::config::InsightsConfig;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const BUILD_NUMBER: Option<&str> = option_env!("INSIGHTS_BUILD_NUMBER");
const BUILD_TIMESTAMP: Option<&str> = option_env!("INSIGHTS_BUILD_TIMESTAMP");
const BUILD_PROFILE: Option<&str> = option_env!("INSIGHTS_BUILD_PROFILE");

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    /// Local compile counter; 0 when built without the build script
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub profile: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self::from_parts(BUILD_NUMBER, BUILD_TIMESTAMP, BUILD_PROFILE)
    }

    fn from_parts(number: Option<&str>, timestamp: Option<&'static str>, profile: Option<&'static str>) -> Self {
        Self {
            version: VERSION,
            build_number: number.and_then(|n| n.trim().parse().ok()).unwrap_or(0),
            build_timestamp: timestamp.unwrap_or("unknown"),
            profile: profile.unwrap_or("unknown"),
        }
    }

    /// `health-insights/<version>+<build>` sent to the analysis service
    pub fn user_agent(&self) -> String {
        format!("health-insights/{}+{}", self.version, self.build_number)
    }

    /// Banner lines describing this build and the services it will use
    pub fn banner(&self, config: &InsightsConfig) -> Vec<String> {
        vec![
            format!("Health Insights {} (build {}, {})", self.version, self.build_number, self.profile),
            format!("Compiled:         {}", self.build_timestamp),
            format!("Analysis service: {}", config.api_base_url),
            format!("Request timeout:  {}s", config.request_timeout_secs),
            format!("Identity store:   {}", config.database_path.display()),
            format!("Reports:          {}", config.report_dir.display()),
        ]
    }
}

/// Print the startup banner to stderr
pub fn print_startup_banner(config: &InsightsConfig) {
    let lines = BuildInfo::current().banner(config);
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 4;

    eprintln!("{}", "=".repeat(width));
    for line in &lines {
        eprintln!("  {}", line);
    }
    eprintln!("{}", "=".repeat(width));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_missing_or_bad_build_values_default() {
        let info = BuildInfo::from_parts(Some("not-a-number"), None, None);
        assert_eq!(info.build_number, 0);
        assert_eq!(info.build_timestamp, "unknown");
        assert_eq!(info.profile, "unknown");

        let info = BuildInfo::from_parts(Some(" 42 "), Some("2024-01-01T00:00:00Z"), Some("release"));
        assert_eq!(info.build_number, 42);
        assert_eq!(info.user_agent(), format!("health-insights/{}+42", VERSION));
    }

    #[test]
    fn test_banner_names_endpoint_and_stores() {
        let config = InsightsConfig {
            api_base_url: "http://analysis.local:8000".to_string(),
            database_path: PathBuf::from("/data/insights.db"),
            report_dir: PathBuf::from("/data/reports"),
            request_timeout_secs: 90,
        };

        let banner = BuildInfo::from_parts(Some("7"), None, Some("debug")).banner(&config);
        assert!(banner[0].contains("build 7, debug"));
        assert!(banner.iter().any(|l| l.contains("http://analysis.local:8000")));
        assert!(banner.iter().any(|l| l.contains("90s")));
        assert!(banner.iter().any(|l| l.contains("/data/insights.db")));
    }
}
