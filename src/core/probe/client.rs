//! Probe Client Implementations
//!
//! HTTP transport abstraction for single probe attempts: GET only, no
//! redirects, headers returned for rate-limit extraction. The response body
//! is never read.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "network")]
use isahc::config::{Configurable, RedirectPolicy};
#[cfg(feature = "network")]
use isahc::{HttpClient, Request};

/// Fully prepared outgoing request, credentials already applied
#[derive(Clone)]
pub struct ProbeRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

// Hand-written so credentials in headers or the query never reach debug output.
impl std::fmt::Debug for ProbeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header_names: Vec<&str> = self.headers.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("ProbeRequest")
            .field("url", &self.url.split('?').next().unwrap_or_default())
            .field("headers", &header_names)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Status and headers of a probe response
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status_code: u16,
    /// Lowercased header names
    pub headers: HashMap<String, String>,
    pub duration: Duration,
}

/// Transport-level failure, no HTTP status available
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("network failure: {0}")]
    Network(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Dedicated HTTP client for probe attempts
///
/// # Implementation Requirements
/// * Must use GET (probes never write)
/// * Must not follow redirects
/// * Should honor `request.timeout`; the Prober enforces it independently
#[async_trait::async_trait]
pub trait ProbeClient: Send + Sync {
    async fn send(&self, request: ProbeRequest) -> Result<ProbeResponse, TransportError>;
}

/// Production probe client implementation using isahc
#[cfg(feature = "network")]
pub struct IsahcProbeClient {
    client: HttpClient,
}

#[cfg(feature = "network")]
#[async_trait::async_trait]
impl ProbeClient for IsahcProbeClient {
    async fn send(&self, request: ProbeRequest) -> Result<ProbeResponse, TransportError> {
        let start = Instant::now();

        let mut builder = Request::get(&request.url)
            .timeout(request.timeout)
            .redirect_policy(RedirectPolicy::None)
            .header("User-Agent", concat!("connprobe/", env!("CARGO_PKG_VERSION")))
            .header("Accept", "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let http_request = builder
            .body(Vec::new())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let response = self
            .client
            .send_async(http_request)
            .await
            .map_err(map_isahc_error)?;

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            headers.insert(
                key.as_str().to_lowercase(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }

        Ok(ProbeResponse {
            status_code: response.status().as_u16(),
            headers,
            duration: start.elapsed(),
        })
    }
}

#[cfg(feature = "network")]
fn map_isahc_error(error: isahc::Error) -> TransportError {
    use isahc::error::ErrorKind;

    match error.kind() {
        ErrorKind::Timeout => TransportError::Timeout(error.to_string()),
        ErrorKind::InvalidRequest => TransportError::InvalidRequest(error.to_string()),
        _ => TransportError::Network(error.to_string()),
    }
}

#[cfg(feature = "network")]
impl IsahcProbeClient {
    pub fn new() -> Result<Self, TransportError> {
        let client = HttpClient::builder()
            .redirect_policy(RedirectPolicy::None)
            .build()
            .map_err(|e| {
                TransportError::Network(format!("Failed to create probe client: {}", e))
            })?;
        Ok(Self { client })
    }
}

/// Client used when the `network` feature is disabled; every attempt fails fast
#[cfg(not(feature = "network"))]
#[derive(Default)]
pub struct OfflineProbeClient;

#[cfg(not(feature = "network"))]
#[async_trait::async_trait]
impl ProbeClient for OfflineProbeClient {
    async fn send(&self, _request: ProbeRequest) -> Result<ProbeResponse, TransportError> {
        Err(TransportError::Network(
            "network support disabled at build time".to_string(),
        ))
    }
}

/// Default transport for the current build
pub fn default_client() -> Result<Arc<dyn ProbeClient>, TransportError> {
    #[cfg(feature = "network")]
    let client: Arc<dyn ProbeClient> = Arc::new(IsahcProbeClient::new()?);
    #[cfg(not(feature = "network"))]
    let client: Arc<dyn ProbeClient> = Arc::new(OfflineProbeClient);
    Ok(client)
}
