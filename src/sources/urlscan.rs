// src/sources/urlscan.rs
use crate::normalize::extract_hostnames;
use crate::session::Session;
use crate::sources::Source;
use crate::types::{SourceFailure, SourceInfo, SourceResult};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use std::collections::HashSet;

const PAGE_SIZE: u64 = 100;

#[derive(Debug, Deserialize)]
struct UrlScanResponse {
    #[serde(default)]
    results: Vec<ScanResult>,
    #[serde(default)]
    total: u64,
}

#[derive(Debug, Deserialize)]
struct ScanResult {
    #[serde(default)]
    page: ScanPage,
}

#[derive(Debug, Default, Deserialize)]
struct ScanPage {
    #[serde(default)]
    domain: String,
}

/// urlscan.io scan index source
#[derive(Debug, Clone)]
pub struct UrlScanSource {
    name: String,
    base_url: String,
    max_pages: usize,
}

impl Default for UrlScanSource {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlScanSource {
    pub fn new() -> Self {
        Self {
            name: "urlscan".to_string(),
            base_url: "https://urlscan.io".to_string(),
            max_pages: 4,
        }
    }

    /// Cap on additional result pages fetched beyond the first.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch(
        &self,
        domain: &str,
        session: &Session,
    ) -> Result<(HashSet<String>, bool), SourceFailure> {
        session.check_rate_limit(&self.name).await;

        let url = format!("{}/api/v1/search/?q=domain:{}", self.base_url, domain);
        let response = session.get(&url).await?;
        let body = Session::read_body(response).await?;

        let suffix = format!(".{}", domain);
        let data: UrlScanResponse = match serde_json::from_str(&body) {
            Ok(data) => data,
            Err(_) => {
                // shape drifted: scrape what is still visible in the body
                let hostnames = extract_hostnames(&body, domain)
                    .into_iter()
                    .filter(|hostname| hostname.ends_with(&suffix))
                    .collect();
                return Ok((hostnames, false));
            }
        };

        let mut hostnames = collect_page(&data, &suffix);

        let mut truncated = false;
        for page in page_numbers(data.total, self.max_pages) {
            session.check_rate_limit(&self.name).await;
            let page_url = format!("{}&page={}", url, page);
            match self.fetch_page(&page_url, session).await {
                Ok(page_data) => hostnames.extend(collect_page(&page_data, &suffix)),
                Err(failure) => {
                    debug!("urlscan: pagination stopped at page {}: {}", page, failure);
                    truncated = true;
                    break;
                }
            }
        }

        Ok((hostnames, truncated))
    }

    async fn fetch_page(
        &self,
        url: &str,
        session: &Session,
    ) -> Result<UrlScanResponse, SourceFailure> {
        let response = session.get(url).await?;
        let body = Session::read_body(response).await?;
        serde_json::from_str(&body).map_err(|e| SourceFailure::Parse(e.to_string()))
    }
}

fn collect_page(data: &UrlScanResponse, suffix: &str) -> HashSet<String> {
    data.results
        .iter()
        .map(|result| result.page.domain.trim().to_lowercase())
        .filter(|hostname| !hostname.is_empty() && hostname.ends_with(suffix))
        .collect()
}

/// Additional pages worth fetching for a reported result total, bounded
/// so a huge index entry cannot turn into an unbounded crawl.
fn page_numbers(total: u64, max_extra: usize) -> Vec<u64> {
    if total <= PAGE_SIZE {
        return Vec::new();
    }
    let last_wanted = total / PAGE_SIZE + 1;
    let last_allowed = 1 + max_extra as u64;
    (2..=last_wanted.min(last_allowed)).collect()
}

#[async_trait]
impl Source for UrlScanSource {
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
