// src/engine.rs
use crate::error::Result;
use crate::normalize::prepare_domain;
use crate::output::OutputManager;
use crate::session::Session;
use crate::sources::{all_sources, create_source, Source};
use crate::types::{Config, SourceFailure, SourceResult, SourceStatus, SubscoutError};
use futures::stream::{FuturesUnordered, StreamExt};
use log::{info, warn};
use std::collections::BTreeSet;
use std::time::Instant;

/// Fans every configured source out concurrently and merges whatever
/// comes back into one deduplicated, sorted result set.
pub struct SubscoutEngine {
    config: Config,
    session: Session,
    sources: Vec<Box<dyn Source>>,
}

impl SubscoutEngine {
    pub fn new(config: Config) -> Result<Self> {
        let sources = if config.sources.is_empty() {
            all_sources(&config)
        } else {
            let mut sources = Vec::new();
            for name in &config.sources {
                if let Some(source) = create_source(name, &config) {
                    sources.push(source);
                } else {
                    warn!("Unknown source: {}", name);
                }
            }
            sources
        };

        Self::with_sources(config, sources)
    }

    pub fn with_sources(config: Config, sources: Vec<Box<dyn Source>>) -> Result<Self> {
        if sources.is_empty() {
            return Err(SubscoutError::ConfigError(
                "No valid sources configured".to_string(),
            ));
        }

        let session = Session::new(&config)?;

        Ok(Self {
            config,
            session,
            sources,
        })
    }

    /// Enumerate and hand the result to the configured sink.
    pub async fn run(&self, domain: &str) -> Result<()> {
        let hostnames = self.enumerate(domain).await?;
        let output = OutputManager::new(self.config.output.clone());
        output.write_hostnames(&hostnames)
    }

    /// One enumeration run. Fails only on a malformed target domain;
    /// source-level trouble is absorbed into the merge.
    pub async fn enumerate(&self, domain: &str) -> Result<BTreeSet<String>> {
        let domain = prepare_domain(domain)?;

        info!("Enumerating subdomains for: {}", domain);
        let start = Instant::now();

        let mut futures = FuturesUnordered::new();
        for source in &self.sources {
            let source = source.clone_source();
            let source_name = source.name().to_string();
            let session = self.session.clone();
            let domain = domain.clone();
            let timeout = self.config.timeout;

            futures.push(async move {
                match tokio::time::timeout(timeout, source.query(&domain, &session)).await {
                    Ok(result) => result,
                    Err(_) => SourceResult::failure(&source_name, SourceFailure::Timeout),
                }
            });
        }

        // The union is commutative and idempotent, so completion order never
        // changes the outcome. Only this task touches the accumulator.
        let mut merged = BTreeSet::new();
        while let Some(result) = futures.next().await {
            match &result.status {
                SourceStatus::Success => {
                    info!("{}: {} hostnames", result.source, result.hostnames.len());
                }
                SourceStatus::PartialFailure => {
                    warn!(
                        "{}: partial answer, keeping {} hostnames",
                        result.source,
                        result.hostnames.len()
                    );
                }
                SourceStatus::Failure(failure) => {
                    warn!("{}: {}", result.source, failure);
                }
            }
            merged.extend(result.hostnames);
        }

        info!(
            "Found {} unique hostnames for {} in {:.2}s",
            merged.len(),
            domain,
            start.elapsed().as_secs_f64()
        );

        Ok(merged)
    }
}
