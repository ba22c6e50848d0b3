// src/sources/alienvault.rs
use crate::normalize::extract_hostnames;
use crate::session::Session;
use crate::sources::Source;
use crate::types::{SourceFailure, SourceInfo, SourceResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Deserialize)]
struct OtxResponse {
    #[serde(default)]
    passive_dns: Vec<PassiveDnsRecord>,
}

#[derive(Debug, Deserialize)]
struct PassiveDnsRecord {
    #[serde(default)]
    hostname: String,
}

/// AlienVault OTX passive DNS source
#[derive(Debug, Clone)]
pub struct AlienVaultSource {
    name: String,
    base_url: String,
    api_keys: Vec<String>,
}

impl Default for AlienVaultSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AlienVaultSource {
    pub fn new() -> Self {
        Self {
            name: "alienvault".to_string(),
            base_url: "https://otx.alienvault.com".to_string(),
            api_keys: Vec::new(),
        }
    }

    pub fn with_api_keys(mut self, keys: Vec<String>) -> Self {
        self.api_keys = keys;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn pick_api_key(&self) -> Option<&String> {
        if self.api_keys.is_empty() {
            None
        } else {
            use rand::seq::SliceRandom;
            self.api_keys.choose(&mut rand::thread_rng())
        }
    }

    async fn fetch(&self, domain: &str, session: &Session) -> Result<HashSet<String>, SourceFailure> {
        session.check_rate_limit(&self.name).await;

        let url = format!(
            "{}/api/v1/indicators/hostname/{}/passive_dns",
            self.base_url, domain
        );

        // The public tier answers without a key; the header is sent either way.
        let api_key = self.pick_api_key().cloned().unwrap_or_default();
        let response = session
            .client
            .get(&url)
            .header("X-OTX-API-KEY", api_key)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SourceFailure::Timeout
                } else {
                    SourceFailure::Network(e.to_string())
                }
            })?;

        let body = Session::read_body(response).await?;
        Ok(parse_records(&body, domain))
    }
}

/// Passive DNS records carry one hostname each. The filter here is
/// stricter than elsewhere: the record must literally end with
/// `"." + domain`, with no wildcard handling and the root excluded.
fn parse_records(body: &str, domain: &str) -> HashSet<String> {
    let suffix = format!(".{}", domain);
    match serde_json::from_str::<OtxResponse>(body) {
        Ok(data) => data
            .passive_dns
            .iter()
            .map(|record| record.hostname.trim().to_lowercase())
            .filter(|hostname| !hostname.is_empty() && hostname.ends_with(&suffix))
            .collect(),
        Err(_) => extract_hostnames(body, domain)
            .into_iter()
            .filter(|hostname| hostname.ends_with(&suffix))
            .collect(),
    }
}

#[async_trait]
impl Source for AlienVaultSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: self.name().to_string(),
            needs_key: false,
            is_default: true,
        }
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn query(&self, domain: &str, session: &Session) -> SourceResult {
        match self.fetch(domain, session).await {
            Ok(hostnames) => SourceResult::success(&self.name, hostnames),
            Err(failure) => SourceResult::failure(&self.name, failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Config, SourceStatus};

    #[test]
    fn keeps_only_strict_suffix_matches() {
        let body = r#"{"passive_dns": [
            {"hostname": "Mail.example.com "},
            {"hostname": "example.com"},
            {"hostname": "evil.com"},
            {"hostname": ""}
        ]}"#;

        let hostnames = parse_records(body, "example.com");
        assert_eq!(hostnames.len(), 1);
        assert!(hostnames.contains("mail.example.com"));
    }

    #[test]
    fn scrapes_degraded_bodies_with_the_same_filter() {
        let body = "passive_dns: vpn.example.com seen 2024";
        let hostnames = parse_records(body, "example.com");
        assert_eq!(hostnames.len(), 1);
        assert!(hostnames.contains("vpn.example.com"));
    }

    #[tokio::test]
    async fn queries_the_passive_dns_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/indicators/hostname/example.com/passive_dns")
            .with_status(200)
            .with_body(r#"{"passive_dns": [{"hostname": "dev.example.com"}]}"#)
            .create_async()
            .await;

        let source = AlienVaultSource::new().with_base_url(server.url());
        let session = Session::new(&Config::default()).unwrap();

        let result = source.query("example.com", &session).await;
        assert_eq!(result.status, SourceStatus::Success);
        assert!(result.hostnames.contains("dev.example.com"));
    }

    #[tokio::test]
    async fn captures_http_rejection_as_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/indicators/hostname/example.com/passive_dns")
            .with_status(429)
            .create_async()
            .await;

        let source = AlienVaultSource::new().with_base_url(server.url());
        let session = Session::new(&Config::default()).unwrap();

        let result = source.query("example.com", &session).await;
        assert_eq!(result.status, SourceStatus::Failure(SourceFailure::Http(429)));
    }
}
