// src/sources/webarchive.rs
use crate::normalize::{extract_hostnames, host_of_url, normalize};
use crate::session::Session;
use crate::sources::Source;
use crate::types::{SourceFailure, SourceInfo, SourceResult};
use async_trait::async_trait;
use log::debug;
use std::collections::HashSet;

/// web.archive.org historical capture index source
#[derive(Debug, Clone)]
pub struct WebArchiveSource {
    name: String,
    // plain HTTP first: the archive's TLS endpoint is the flakier of the two
    bases: Vec<String>,
}

impl Default for WebArchiveSource {
    fn default() -> Self {
        Self::new()
    }
}

impl WebArchiveSource {
    pub fn new() -> Self {
        Self {
            name: "webarchive".to_string(),
            bases: vec![
                "http://web.archive.org".to_string(),
                "https://web.archive.org".to_string(),
            ],
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.bases = vec![base_url.into()];
        self
    }

    async fn fetch(
        &self,
        domain: &str,
        session: &Session,
    ) -> Result<(HashSet<String>, bool), SourceFailure> {
        let mut last_failure = None;

        for base in &self.bases {
            session.check_rate_limit(&self.name).await;
            let url = format!(
                "{}/cdx/search/cdx?url=*.{}/*&output=json&collapse=urlkey&limit=5000&fl=original",
                base, domain
            );
            let body = match self.get_body(&url, session).await {
                Ok(body) => body,
                Err(failure) => {
                    debug!("webarchive: {} unreachable: {}", base, failure);
                    last_failure = Some(failure);
                    continue;
                }
            };

            let hostnames = parse_captures(&body, domain);
            if !hostnames.is_empty() {
                return Ok((hostnames, false));
            }
        }

        // CDX came up dry; the timemap index sometimes still knows the domain.
        let recovered = self
            .fetch_timemap(domain, session)
            .await
            .unwrap_or_default();

        match last_failure {
            None => Ok((recovered, false)),
            Some(_) if !recovered.is_empty() => Ok((recovered, true)),
            Some(failure) => Err(failure),
        }
    }

    async fn fetch_timemap(
        &self,
        domain: &str,
        session: &Session,
    ) -> Result<HashSet<String>, SourceFailure> {
        let base = self.bases.last().map(String::as_str).unwrap_or_default();
        let url = format!(
            "{}/web/timemap/json?url={}&matchType=domain&output=json",
            base, domain
        );
        session.check_rate_limit(&self.name).await;
        let body = self.get_body(&url, session).await?;

        let hostnames = match serde_json::from_str::<Vec<Vec<String>>>(&body) {
            Ok(rows) => {
                let mut hostnames = HashSet::new();
                for row in rows.iter().skip(1) {
                    if let Some(cell) = row.get(2).or_else(|| row.first()) {
                        harvest(cell, domain, &mut hostnames);
                    }
                }
                hostnames
            }
            Err(_) => extract_hostnames(&body, domain).into_iter().collect(),
        };
        Ok(hostnames)
    }

    async fn get_body(&self, url: &str, session: &Session) -> Result<String, SourceFailure> {
        let response = session.get_lenient(url).await?;
        Session::read_body(response).await
    }
}

/// CDX answers are a JSON array of rows, first row a header. When the
/// body is not the JSON shape (the endpoint also speaks a whitespace
/// table), every line is scraped for domain-anchored hosts instead.
fn parse_captures(body: &str, domain: &str) -> HashSet<String> {
    let mut hostnames = HashSet::new();
    match serde_json::from_str::<Vec<Vec<String>>>(body) {
        Ok(rows) => {
            for row in rows.iter().skip(1) {
                if let Some(cell) = row.first() {
                    harvest(cell, domain, &mut hostnames);
                }
            }
        }
        Err(_) => {
            for line in body.lines().skip(1) {
                for hostname in extract_hostnames(line, domain) {
                    hostnames.insert(hostname);
                }
            }
        }
    }
    hostnames
}

/// One captured URL may hide several hosts: the capture's own host plus
/// anything embedded in its path (archived redirects).
fn harvest(cell: &str, domain: &str, hostnames: &mut HashSet<String>) {
    if let Some(host) = host_of_url(cell) {
        if let Some(hostname) = normalize(&host, domain) {
            hostnames.insert(hostname);
            return;
        }
    }
    for hostname in extract_hostnames(cell, domain) {
        hostnames.insert(hostname);
    }
}

#[async_trait]
impl Source for WebArchiveSource {
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
            Ok((hostnames, false)) => SourceResult::success(&self.name, hostnames),
            Ok((hostnames, true)) => SourceResult::partial(&self.name, hostnames),
            Err(failure) => SourceResult::failure(&self.name, failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Config, SourceStatus};

    #[test]
    fn reads_hosts_out_of_cdx_rows() {
        let body = r#"[
            ["original"],
            ["http://blog.example.com/post/1"],
            ["https://BLOG.example.com:443/post/2"],
            ["http://cdn.elsewhere.net/x"]
        ]"#;

        let hostnames = parse_captures(body, "example.com");
        assert_eq!(hostnames.len(), 1);
        assert!(hostnames.contains("blog.example.com"));
    }

    #[test]
    fn recovers_hosts_embedded_in_capture_paths() {
        let body = r#"[["original"],["http://mirror.net/fetch?u=http://old.example.com/"]]"#;
        let hostnames = parse_captures(body, "example.com");
        assert!(hostnames.contains("old.example.com"));
    }

    #[test]
    fn falls_back_to_line_scraping_for_tabular_bodies() {
        let body = "urlkey timestamp original\nkey1 2019 http://static.example.com/app.js";
        let hostnames = parse_captures(body, "example.com");
        assert_eq!(hostnames.len(), 1);
        assert!(hostnames.contains("static.example.com"));
    }

    #[tokio::test]
    async fn queries_the_cdx_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/cdx/search/cdx")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"[["original"],["http://docs.example.com/"]]"#)
            .create_async()
            .await;

        let source = WebArchiveSource::new().with_base_url(server.url());
        let session = Session::new(&Config::default()).unwrap();

        let result = source.query("example.com", &session).await;
        assert_eq!(result.status, SourceStatus::Success);
        assert!(result.hostnames.contains("docs.example.com"));
    }

    #[tokio::test]
    async fn consults_the_timemap_when_cdx_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let _cdx = server
            .mock("GET", "/cdx/search/cdx")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        let _timemap = server
            .mock("GET", "/web/timemap/json")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"[["urlkey","timestamp","original"],["key","2020","http://legacy.example.com/"]]"#)
            .create_async()
            .await;

        let source = WebArchiveSource::new().with_base_url(server.url());
        let session = Session::new(&Config::default()).unwrap();

        let result = source.query("example.com", &session).await;
        assert_eq!(result.status, SourceStatus::Success);
        assert!(result.hostnames.contains("legacy.example.com"));
    }
}
