// src/sources/crtsh.rs
use crate::normalize::{extract_hostnames, normalize, parent_domain};
use crate::session::Session;
use crate::sources::Source;
use crate::types::{SourceFailure, SourceInfo, SourceResult};
use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Deserialize)]
struct CrtShEntry {
    name_value: String,
}

/// crt.sh certificate transparency logs source
#[derive(Debug, Clone)]
pub struct CrtShSource {
    name: String,
    base_url: String,
}

impl Default for CrtShSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CrtShSource {
    pub fn new() -> Self {
        Self {
            name: "crtsh".to_string(),
            base_url: "https://crt.sh".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    // crt.sh answers differently depending on how the match expression is
    // written; try the known spellings in order.
    fn json_endpoints(&self, domain: &str) -> Vec<String> {
        vec![
            format!("{}/?q=%25.{}&output=json", self.base_url, domain),
            format!(
                "{}/?q={}&output=json",
                self.base_url,
                urlencoding::encode(&format!("%.{}", domain))
            ),
            format!("{}/?q=.{}&output=json", self.base_url, domain),
        ]
    }

    fn html_endpoint(&self, domain: &str) -> String {
        format!(
            "{}/?q={}",
            self.base_url,
            urlencoding::encode(&format!("%.{}", domain))
        )
    }

    async fn fetch(&self, domain: &str, session: &Session) -> Result<HashSet<String>, SourceFailure> {
        let mut last_failure = None;

        for url in self.json_endpoints(domain) {
            session.check_rate_limit(&self.name).await;
            let response = match session.get_lenient(&url).await {
                Ok(response) => response,
                Err(failure) => {
                    debug!("crtsh: {} unreachable: {}", url, failure);
                    last_failure = Some(failure);
                    continue;
                }
            };
            let body = match Session::read_body(response).await {
                Ok(body) => body,
                Err(failure) => {
                    debug!("crtsh: {} rejected: {}", url, failure);
                    last_failure = Some(failure);
                    continue;
                }
            };

            let hostnames = parse_entries(&body, domain);
            if !hostnames.is_empty() {
                return Ok(hostnames);
            }
        }

        // Last resort: the HTML results table, scraped for anchored names.
        session.check_rate_limit(&self.name).await;
        match session.get_lenient(&self.html_endpoint(domain)).await {
            Ok(response) => match Session::read_body(response).await {
                Ok(body) => {
                    let hostnames: HashSet<String> =
                        extract_hostnames(&body, domain).into_iter().collect();
                    if !hostnames.is_empty() {
                        return Ok(hostnames);
                    }
                }
                Err(failure) => last_failure = Some(failure),
            },
            Err(failure) => last_failure = Some(failure),
        }

        match last_failure {
            Some(failure) => Err(failure),
            // every endpoint answered and none knew the domain
            None => Ok(HashSet::new()),
        }
    }
}

/// Certificate entries are JSON when crt.sh is healthy, but the format
/// drifts without notice; a body that no longer decodes is scraped for
/// domain-anchored names instead of being treated as a dead end.
fn parse_entries(body: &str, domain: &str) -> HashSet<String> {
    match serde_json::from_str::<Vec<CrtShEntry>>(body) {
        Ok(entries) => {
            let mut hostnames = HashSet::new();
            for entry in entries {
                // one certificate can carry several identities, newline separated
                for line in entry.name_value.lines() {
                    if let Some(hostname) = normalize(line, domain) {
                        hostnames.insert(hostname);
                    }
                }
            }
            hostnames
        }
        Err(_) => extract_hostnames(body, domain).into_iter().collect(),
    }
}

#[async_trait]
impl Source for CrtShSource {
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
            Err(failure) => {
                // Retry once against the registrable parent, but only after a
                // hard error. An empty-but-successful answer stays empty.
                let parent = parent_domain(domain);
                if parent != domain {
                    warn!(
                        "crtsh: {} failed ({}), retrying against parent {}",
                        domain, failure, parent
                    );
                    if let Ok(hostnames) = self.fetch(&parent, session).await {
                        // answers a widened query, so never reported as a full success
                        return SourceResult::partial(&self.name, hostnames);
                    }
                }
                SourceResult::failure(&self.name, failure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Config, SourceStatus};

    #[test]
    fn parses_multivalued_certificate_identities() {
        let body = r#"[
            {"name_value": "www.example.com\n*.api.example.com"},
            {"name_value": "WWW.example.com"},
            {"name_value": "unrelated.org"}
        ]"#;

        let hostnames = parse_entries(body, "example.com");
        assert_eq!(hostnames.len(), 2);
        assert!(hostnames.contains("www.example.com"));
        assert!(hostnames.contains("api.example.com"));
    }

    #[test]
    fn scrapes_names_out_of_non_json_bodies() {
        let body = "<TD>foo.example.com</TD><TD>notexample.com</TD>";
        let hostnames = parse_entries(body, "example.com");
        assert_eq!(hostnames.len(), 1);
        assert!(hostnames.contains("foo.example.com"));
    }

    #[tokio::test]
    async fn falls_back_to_scraping_when_endpoint_returns_html() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("<html>foo.example.com</html>")
            .create_async()
            .await;

        let source = CrtShSource::new().with_base_url(server.url());
        let session = Session::new(&Config::default()).unwrap();

        let result = source.query("example.com", &session).await;
        assert_eq!(result.status, SourceStatus::Success);
        assert!(result.hostnames.contains("foo.example.com"));
    }

    #[tokio::test]
    async fn reports_http_failure_when_every_variant_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let source = CrtShSource::new().with_base_url(server.url());
        let session = Session::new(&Config::default()).unwrap();

        let result = source.query("example.com", &session).await;
        assert!(result.hostnames.is_empty());
        assert_eq!(result.status, SourceStatus::Failure(SourceFailure::Http(503)));
    }
}
