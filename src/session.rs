// src/session.rs
use crate::types::{Config, SourceFailure, SubscoutError};
use governor::Quota;
use reqwest::Client;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Shared HTTP state handed to every source: one strict-TLS client, one
/// permissive client for endpoints with known certificate friction, and
/// per-source rate limiters.
#[derive(Clone)]
pub struct Session {
    pub client: Client,
    pub lenient_client: Client,
    rate_limiters: Arc<HashMap<String, Arc<governor::DefaultDirectRateLimiter>>>,
}

impl Session {
    pub fn new(config: &Config) -> Result<Self, SubscoutError> {
        let client = Self::builder(config)
            .build()
            .map_err(|e| SubscoutError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        // Some sources terminate TLS badly enough that strict verification
        // starves them of results. Accepting their certificates anyway is a
        // deliberate trust decision, scoped to this client and overridable
        // with `verify_tls`.
        let lenient_client = Self::builder(config)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| SubscoutError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        let mut rate_limiters = HashMap::new();
        for (source, rate_limit) in &config.rate_limits {
            if let Some(limit) = rate_limit.and_then(NonZeroU32::new) {
                let quota = Quota::per_second(limit).allow_burst(NonZeroU32::new(1).unwrap());
                let limiter = Arc::new(governor::RateLimiter::direct(quota));
                rate_limiters.insert(source.clone(), limiter);
            }
        }

        Ok(Session {
            client,
            lenient_client,
            rate_limiters: Arc::new(rate_limiters),
        })
    }

    fn builder(config: &Config) -> reqwest::ClientBuilder {
        Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .deflate(true)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
    }

    /// Wait until the source is allowed to issue its next request.
    pub async fn check_rate_limit(&self, source: &str) {
        if let Some(limiter) = self.rate_limiters.get(source) {
            limiter.until_ready().await;
        }
    }

    pub async fn get(&self, url: &str) -> Result<reqwest::Response, SourceFailure> {
        Self::classify(self.client.get(url).send().await)
    }

    /// GET through the certificate-lenient client.
    pub async fn get_lenient(&self, url: &str) -> Result<reqwest::Response, SourceFailure> {
        Self::classify(self.lenient_client.get(url).send().await)
    }

    fn classify(
        result: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<reqwest::Response, SourceFailure> {
        match result {
            Ok(response) => Ok(response),
            Err(e) if e.is_timeout() => Err(SourceFailure::Timeout),
            Err(e) => Err(SourceFailure::Network(e.to_string())),
        }
    }

    /// Response body of a successful request; non-2xx statuses become
    /// `SourceFailure::Http` so adapters can fall through to their next
    /// endpoint variant.
    pub async fn read_body(response: reqwest::Response) -> Result<String, SourceFailure> {
        let status = response.status();
        if !status.is_success() {
            return Err(SourceFailure::Http(status.as_u16()));
        }
        response
            .text()
            .await
            .map_err(|e| SourceFailure::Network(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Config;

    #[test]
    fn builds_both_clients() {
        let session = Session::new(&Config::default());
        assert!(session.is_ok());
    }

    #[tokio::test]
    async fn unlimited_source_is_not_throttled() {
        let session = Session::new(&Config::default()).unwrap();
        // no limiter registered for crtsh: must return immediately
        session.check_rate_limit("crtsh").await;
    }
}
