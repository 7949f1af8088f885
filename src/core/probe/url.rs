//! URL Construction Utilities for Probe Attempts
//!
//! Provides the small set of URL operations the engine needs:
//! - Base URL validation and normalization
//! - Joining an endpoint path onto the configured origin
//! - Appending an API-key query parameter to an outgoing request URL

use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum UrlError {
    #[error("Invalid URL format: {0}")]
    ParseError(#[from] url::ParseError),
    #[error("Missing host in URL")]
    MissingHost,
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
}

/// Validate that a base URL is an absolute http(s) URL with a host
///
/// # Examples
/// - `https://shop.example.com` → Ok
/// - `http://localhost:8080/site` → Ok
/// - `ftp://files.example.com` → `UnsupportedScheme`
/// - `shop.example.com` → `ParseError`
pub fn validate_base_url(base_url: &str) -> Result<Url, UrlError> {
    let url = Url::parse(base_url.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlError::UnsupportedScheme(other.to_string())),
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Normalize base URL by trimming whitespace and trailing slashes
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join an endpoint path onto a base URL, keeping any path prefix of the base
///
/// # Examples
/// - (`https://shop.example.com/`, `/wp-json`) → `https://shop.example.com/wp-json`
/// - (`https://example.com/store`, `/wp-json/wc/v3`) → `https://example.com/store/wp-json/wc/v3`
/// - (`https://api.example.com`, `/`) → `https://api.example.com/`
pub fn join_endpoint(base_url: &str, path: &str) -> Result<String, UrlError> {
    let joined = format!("{}{}", normalize_base_url(base_url), path);
    let url = validate_base_url(&joined)?;
    Ok(url.to_string())
}

/// Append a single query parameter, preserving existing ones
pub fn append_query(url: &str, name: &str, value: &str) -> Result<String, UrlError> {
    let mut url = Url::parse(url)?;
    url.query_pairs_mut().append_pair(name, value);
    Ok(url.to_string())
}

/// Absolute URL reported as the detected service base
///
/// Falls back to plain concatenation so a verdict never depends on URL parsing.
pub fn detected_base_url(base_url: &str, namespace: &str) -> String {
    join_endpoint(base_url, namespace)
        .unwrap_or_else(|_| format!("{}{}", normalize_base_url(base_url), namespace))
}
