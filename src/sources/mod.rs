// src/sources/mod.rs
use crate::session::Session;
use crate::types::{Config, SourceInfo, SourceResult};
use async_trait::async_trait;

mod alienvault;
mod crtsh;
mod urlscan;
mod webarchive;

pub use alienvault::AlienVaultSource;
pub use crtsh::CrtShSource;
pub use urlscan::UrlScanSource;
pub use webarchive::WebArchiveSource;

/// One external data source behind a uniform contract.
///
/// `query` never fails: whatever happens on the wire is captured in the
/// returned [`SourceResult`] status, so one misbehaving source can never
/// abort the run for the others.
#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &str;
    fn info(&self) -> SourceInfo;
    async fn query(&self, domain: &str, session: &Session) -> SourceResult;
    fn clone_source(&self) -> Box<dyn Source>;
}

/// Instantiate a source by name with configuration applied.
pub fn create_source(name: &str, config: &Config) -> Option<Box<dyn Source>> {
    let api_keys = config.api_keys.get(name).cloned().unwrap_or_default();

    match name.to_lowercase().as_str() {
        "crtsh" => {
            let source = CrtShSource::new();
            Some(Box::new(source))
        }
        "alienvault" => {
            let source = AlienVaultSource::new().with_api_keys(api_keys);
            Some(Box::new(source))
        }
        "urlscan" => {
            let source = UrlScanSource::new().with_max_pages(config.max_pages);
            Some(Box::new(source))
        }
        "webarchive" => {
            let source = WebArchiveSource::new();
            Some(Box::new(source))
        }
        _ => None,
    }
}

/// All available sources with configuration applied.
pub fn all_sources(config: &Config) -> Vec<Box<dyn Source>> {
    vec!["crtsh", "alienvault", "urlscan", "webarchive"]
        .into_iter()
        .filter_map(|name| create_source(name, config))
        .collect()
}

pub fn accepts_api_key(source_name: &str) -> bool {
    matches!(source_name.to_lowercase().as_str(), "alienvault")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Config;

    #[test]
    fn test_create_source() {
        let config = Config::default();

        let source = create_source("crtsh", &config);
        assert!(source.is_some());

        let source = create_source("invalid", &config);
        assert!(source.is_none());
    }

    #[test]
    fn all_sources_match_default_config() {
        let config = Config::default();
        let sources = all_sources(&config);
        assert_eq!(sources.len(), config.sources.len());
    }

    #[test]
    fn test_accepts_api_key() {
        assert!(accepts_api_key("alienvault"));
        assert!(!accepts_api_key("crtsh"));
        assert!(!accepts_api_key("invalid"));
    }
}
