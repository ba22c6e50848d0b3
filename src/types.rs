// src/types.rs
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub timeout: Duration,
    pub user_agent: String,
    pub verify_tls: bool,
    pub max_pages: usize,
    pub rate_limits: HashMap<String, Option<u32>>,
    pub api_keys: HashMap<String, Vec<String>>,
    pub output: OutputConfig,
    pub sources: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let mut rate_limits = HashMap::new();
        rate_limits.insert("alienvault".to_string(), Some(1));
        rate_limits.insert("urlscan".to_string(), Some(2));

        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("subscout/{}", env!("CARGO_PKG_VERSION")),
            verify_tls: false,
            max_pages: 4,
            rate_limits,
            api_keys: HashMap::new(),
            output: OutputConfig::default(),
            sources: vec![
                "crtsh".to_string(),
                "alienvault".to_string(),
                "urlscan".to_string(),
                "webarchive".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    pub file: Option<String>,
}

pub struct SourceInfo {
    pub name: String,
    pub needs_key: bool,
    pub is_default: bool,
}

/// Failure local to a single source. Never crosses the engine boundary
/// except embedded in a [`SourceResult`] status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceFailure {
    #[error("request timed out")]
    Timeout,

    #[error("unexpected HTTP status: {0}")]
    Http(u16),

    #[error("failed to decode response: {0}")]
    Parse(String),

    #[error("network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Success,
    /// The source answered, but part of the data is missing (a pagination
    /// page failed, or results come from a widened parent-domain query).
    PartialFailure,
    Failure(SourceFailure),
}

/// What one adapter contributes to a run. Adapters always return this,
/// whatever happened on the wire.
#[derive(Debug)]
pub struct SourceResult {
    pub source: String,
    pub hostnames: HashSet<String>,
    pub status: SourceStatus,
}

impl SourceResult {
    pub fn success(source: &str, hostnames: HashSet<String>) -> Self {
        Self {
            source: source.to_string(),
            hostnames,
            status: SourceStatus::Success,
        }
    }

    pub fn partial(source: &str, hostnames: HashSet<String>) -> Self {
        Self {
            source: source.to_string(),
            hostnames,
            status: SourceStatus::PartialFailure,
        }
    }

    pub fn failure(source: &str, failure: SourceFailure) -> Self {
        Self {
            source: source.to_string(),
            hostnames: HashSet::new(),
            status: SourceStatus::Failure(failure),
        }
    }
}

#[derive(Debug, Error)]
pub enum SubscoutError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Output error: {0}")]
    OutputError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unknown error: {0}")]
    Unknown(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_lists_all_sources() {
        let config = Config::default();
        assert_eq!(config.sources.len(), 4);
        assert!(config.timeout.as_secs() > 0);
        assert!(config.max_pages >= 1);
    }

    #[test]
    fn failure_result_carries_no_hostnames() {
        let result = SourceResult::failure("crtsh", SourceFailure::Timeout);
        assert!(result.hostnames.is_empty());
        assert_eq!(result.status, SourceStatus::Failure(SourceFailure::Timeout));
    }
}
