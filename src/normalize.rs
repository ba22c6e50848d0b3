// src/normalize.rs
//
// Turns raw matches pulled out of source responses into canonical
// hostnames under the target domain, or rejects them.
use crate::error::Result;
use crate::types::SubscoutError;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

/// Validate and canonicalize the target domain before any source is queried.
pub fn prepare_domain(raw: &str) -> Result<String> {
    let domain = raw.trim().trim_end_matches('.').to_lowercase();
    if !is_valid_domain(&domain) {
        return Err(SubscoutError::InvalidDomain(raw.to_string()));
    }
    Ok(domain)
}

/// Check if a string is a structurally valid domain
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > 253 {
        return false;
    }

    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() < 2 {
        return false;
    }

    for part in parts {
        if part.is_empty() || part.len() > 63 {
            return false;
        }

        if !part.chars().all(|c| c.is_alphanumeric() || c == '-') {
            return false;
        }

        if part.starts_with('-') || part.ends_with('-') {
            return false;
        }
    }

    true
}

/// Canonicalize one raw match. Accepts the domain itself and proper
/// subdomains of it; a leading wildcard label is stripped to its concrete
/// boundary (`*.api.example.com` -> `api.example.com`). Anything else,
/// including names with an embedded `*`, is rejected.
pub fn normalize(raw: &str, domain: &str) -> Option<String> {
    let mut host = raw.trim().to_lowercase();
    if host.is_empty() {
        return None;
    }

    if let Some(stripped) = host.strip_prefix("*.") {
        host = stripped.to_string();
    }
    if host.contains('*') {
        return None;
    }

    while host.ends_with('.') {
        host.pop();
    }

    if host == domain || host.ends_with(&format!(".{}", domain)) {
        return Some(host);
    }

    // Tokens lifted out of URLs or markup still carry scheme/path noise.
    extract_hostnames(&host, domain).into_iter().next()
}

/// Extract every domain-anchored hostname embedded in free text (URLs,
/// HTML, CDX rows). The leading boundary guards against substring
/// collisions such as `notexample.com` for `example.com`.
pub fn extract_hostnames(raw: &str, domain: &str) -> Vec<String> {
    let text = raw.trim().to_lowercase().replace("*.", "");
    if text.is_empty() {
        return Vec::new();
    }

    let pattern = format!(
        r"(?:^|[^a-z0-9.-])((?:[a-z0-9](?:[a-z0-9-]{{0,61}}[a-z0-9])?\.)*{})",
        regex::escape(domain)
    );
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    let mut seen = HashSet::new();
    let mut hostnames = Vec::new();
    for cap in re.captures_iter(&text) {
        if let Some(candidate) = cap.get(1) {
            let candidate = candidate.as_str().to_string();
            if !candidate.contains("..") && seen.insert(candidate.clone()) {
                hostnames.push(candidate);
            }
        }
    }

    hostnames
}

/// Host part of a raw token that parses as a full URL.
pub fn host_of_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    url.host_str().map(|host| host.to_lowercase())
}

/// Registrable parent form of a deep subdomain (last two labels).
pub fn parent_domain(domain: &str) -> String {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() <= 2 {
        return domain.to_string();
    }
    labels[labels.len() - 2..].join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_domain() {
        assert_eq!(prepare_domain("  Example.COM ").unwrap(), "example.com");
        assert_eq!(prepare_domain("example.com.").unwrap(), "example.com");
        assert!(prepare_domain("").is_err());
        assert!(prepare_domain("nodots").is_err());
        assert!(prepare_domain("-bad.example.com").is_err());
    }

    #[test]
    fn normalize_strips_wildcard_label() {
        assert_eq!(
            normalize("*.api.example.com", "example.com"),
            Some("api.example.com".to_string())
        );
    }

    #[test]
    fn normalize_rejects_embedded_wildcard() {
        assert_eq!(normalize("api.*.example.com", "example.com"), None);
    }

    #[test]
    fn normalize_accepts_root_domain() {
        assert_eq!(
            normalize("Example.com", "example.com"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn normalize_rejects_substring_collision() {
        assert_eq!(normalize("notexample.com", "example.com"), None);
        assert_eq!(normalize("evil.com", "example.com"), None);
        assert_eq!(normalize("", "example.com"), None);
    }

    #[test]
    fn normalize_handles_url_noise() {
        assert_eq!(
            normalize("https://www.example.com/login", "example.com"),
            Some("www.example.com".to_string())
        );
    }

    #[test]
    fn extract_finds_all_candidates() {
        let text = "see https://a.example.com/x#b.example.com and notexample.com";
        let found = extract_hostnames(text, "example.com");
        assert!(found.contains(&"a.example.com".to_string()));
        assert!(found.contains(&"b.example.com".to_string()));
        assert!(!found.iter().any(|h| h == "notexample.com"));
    }

    #[test]
    fn extract_recovers_wildcard_names_from_text() {
        let found = extract_hostnames("cert for *.mail.example.com issued", "example.com");
        assert_eq!(found, vec!["mail.example.com".to_string()]);
    }

    #[test]
    fn test_host_of_url() {
        assert_eq!(
            host_of_url("http://API.example.com/path?x=1"),
            Some("api.example.com".to_string())
        );
        assert_eq!(host_of_url("not a url"), None);
    }

    #[test]
    fn test_parent_domain() {
        assert_eq!(parent_domain("a.b.example.com"), "example.com");
        assert_eq!(parent_domain("example.com"), "example.com");
    }
}
