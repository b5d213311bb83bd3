//! Configuration
//!
//! Environment-driven settings resolved once at startup.

use std::path::PathBuf;
use std::time::Duration;

use crate::client::parse_base_url;
use crate::error::{InsightsError, InsightsResult};

pub const ENV_API_URL: &str = "INSIGHTS_API_URL";
pub const ENV_DATABASE_PATH: &str = "INSIGHTS_DATABASE_PATH";
pub const ENV_REPORT_DIR: &str = "INSIGHTS_REPORT_DIR";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "INSIGHTS_REQUEST_TIMEOUT_SECS";

const DEFAULT_API_URL: &str = "http://localhost:8000";
/// Analysis is LLM-backed and routinely takes tens of seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct InsightsConfig {
    /// Base URL of the analysis service
    pub api_base_url: String,
    /// SQLite identity store
    pub database_path: PathBuf,
    /// Where exported reports are written
    pub report_dir: PathBuf,
    pub request_timeout_secs: u64,
}

impl InsightsConfig {
    pub fn from_env() -> InsightsResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> InsightsResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let root = project_root();

        let request_timeout_secs = match lookup(ENV_REQUEST_TIMEOUT_SECS) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                InsightsError::Config(format!("{} must be a whole number of seconds", ENV_REQUEST_TIMEOUT_SECS))
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        let config = Self {
            api_base_url: lookup(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            database_path: lookup(ENV_DATABASE_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| root.join("data").join("insights.db")),
            report_dir: lookup(ENV_REPORT_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| root.join("reports")),
            request_timeout_secs,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> InsightsResult<()> {
        parse_base_url(&self.api_base_url)?;

        if self.request_timeout_secs == 0 {
            return Err(InsightsError::Config(format!(
                "{} must be greater than 0",
                ENV_REQUEST_TIMEOUT_SECS
            )));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Directory holding the executable, lifted out of `target/{debug,release}`
fn project_root() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
            path = grandparent.to_path_buf();
        }
    }

    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = InsightsConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert_eq!(config.request_timeout(), Duration::from_secs(120));
        assert!(config.database_path.ends_with("data/insights.db"));
        assert!(config.report_dir.ends_with("reports"));
    }

    #[test]
    fn test_overrides() {
        let config = InsightsConfig::from_lookup(lookup_from(&[
            (ENV_API_URL, "https://insights.example.com"),
            (ENV_DATABASE_PATH, "/tmp/links.db"),
            (ENV_REPORT_DIR, "/tmp/reports"),
            (ENV_REQUEST_TIMEOUT_SECS, "30"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url, "https://insights.example.com");
        assert_eq!(config.database_path, PathBuf::from("/tmp/links.db"));
        assert_eq!(config.report_dir, PathBuf::from("/tmp/reports"));
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(InsightsConfig::from_lookup(lookup_from(&[(ENV_API_URL, "localhost:8000")])).is_err());
        assert!(InsightsConfig::from_lookup(lookup_from(&[(ENV_API_URL, "ftp://example.com")])).is_err());
        assert!(InsightsConfig::from_lookup(lookup_from(&[(ENV_REQUEST_TIMEOUT_SECS, "0")])).is_err());
        assert!(InsightsConfig::from_lookup(lookup_from(&[(ENV_REQUEST_TIMEOUT_SECS, "soon")])).is_err());
    }

    #[test]
    fn test_rejects_url_without_host() {
        for raw in ["http://", "https://", "http:// "] {
            let err = InsightsConfig::from_lookup(lookup_from(&[(ENV_API_URL, raw)])).unwrap_err();
            assert_eq!(err.kind(), "config", "{raw:?} should be rejected");
        }
    }
}
