// Core types for connectivity probing
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;


/// Per-attempt timeout used when neither configuration nor environment sets one
pub const DEFAULT_TIMEOUT_MS: u64 = 8000;

/// Semantic role of an endpoint, used by the reachability classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointRole {
    /// Platform presence check (e.g. `/` or `/wp-json`)
    Root,
    /// Service namespace (e.g. `/wp-json/wc/v3`)
    Namespace,
    /// A concrete resource collection inside the namespace
    ResourceList,
}

/// One relative endpoint of a probed service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSpec {
    /// Path relative to the base origin, always starting with `/`
    pub path: String,
    pub role: EndpointRole,
    /// Namespace path reported as the detected base when this endpoint answers.
    /// Defaults to the endpoint's own path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl EndpointSpec {
    pub fn root(path: &str) -> Self {
        Self {
            path: path.to_string(),
            role: EndpointRole::Root,
            namespace: None,
        }
    }

    pub fn namespace(path: &str) -> Self {
        Self {
            path: path.to_string(),
            role: EndpointRole::Namespace,
            namespace: None,
        }
    }

    pub fn resource_list(path: &str, namespace: &str) -> Self {
        Self {
            path: path.to_string(),
            role: EndpointRole::ResourceList,
            namespace: Some(namespace.to_string()),
        }
    }

    pub fn is_root(&self) -> bool {
        self.role == EndpointRole::Root
    }

    /// Path to report as `detectedBase`; `None` for the root endpoint
    pub fn detected_base_path(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        Some(self.namespace.as_deref().unwrap_or(&self.path))
    }
}

/// Reference to a credential held outside the descriptor
///
/// Deserializes from either a bare variable name (`"CRM_API_KEY"`) or a
/// key/secret pair table (`{ key = "..._CONSUMER_KEY", secret = "..._CONSUMER_SECRET" }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SecretRef {
    /// Single environment variable
    Env(String),
    /// Key/secret pair joined as `key:secret` at use time
    Pair { key: String, secret: String },
}

/// Kind of authentication strategy, safe to report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    None,
    Basic,
    Bearer,
    ApiKeyHeader,
    ApiKeyQuery,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::None => "none",
            AuthMode::Basic => "basic",
            AuthMode::Bearer => "bearer",
            AuthMode::ApiKeyHeader => "api_key_header",
            AuthMode::ApiKeyQuery => "api_key_query",
        }
    }

    /// Plan ordering rank: token strategies first, then basic, then none
    pub fn rank(&self) -> u8 {
        match self {
            AuthMode::Bearer | AuthMode::ApiKeyHeader | AuthMode::ApiKeyQuery => 0,
            AuthMode::Basic => 1,
            AuthMode::None => 2,
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pluggable way of attaching credentials to an outbound request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthStrategy {
    None,
    /// `Authorization: Basic ...`; an `Env` ref is used pre-encoded, a `Pair` is base64-encoded
    Basic { credential: SecretRef },
    Bearer { token: SecretRef },
    ApiKeyHeader { name: String, token: SecretRef },
    ApiKeyQuery { name: String, token: SecretRef },
}

impl AuthStrategy {
    pub fn mode(&self) -> AuthMode {
        match self {
            AuthStrategy::None => AuthMode::None,
            AuthStrategy::Basic { .. } => AuthMode::Basic,
            AuthStrategy::Bearer { .. } => AuthMode::Bearer,
            AuthStrategy::ApiKeyHeader { .. } => AuthMode::ApiKeyHeader,
            AuthStrategy::ApiKeyQuery { .. } => AuthMode::ApiKeyQuery,
        }
    }

    pub fn secret_ref(&self) -> Option<&SecretRef> {
        match self {
            AuthStrategy::None => None,
            AuthStrategy::Basic { credential } => Some(credential),
            AuthStrategy::Bearer { token }
            | AuthStrategy::ApiKeyHeader { token, .. }
            | AuthStrategy::ApiKeyQuery { token, .. } => Some(token),
        }
    }
}

/// Everything the engine needs to probe one service, built once per invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDescriptor {
    /// Service identity used in reports and logs
    pub name: String,
    /// Prefix of the service's environment variables (e.g. `COMMERCE`)
    pub env_prefix: String,
    /// Root origin; `None` means the service is not configured
    pub base_url: Option<String>,
    pub endpoints: Vec<EndpointSpec>,
    pub auth: Vec<AuthStrategy>,
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Optional budget for the whole plan
    pub deadline: Option<Duration>,
}

impl ServiceDescriptor {
    /// Environment variable name for this service, e.g. `env_var("BASE_URL")`
    pub fn env_var(&self, suffix: &str) -> String {
        format!("{}_{}", self.env_prefix, suffix)
    }

    /// Names of every environment variable this descriptor depends on, in a stable order
    pub fn env_names(&self) -> Vec<String> {
        let mut names = vec![self.env_var("BASE_URL")];
        for strategy in &self.auth {
            if let Some(secret_ref) = strategy.secret_ref() {
                for name in secret_ref.env_names() {
                    if !names.iter().any(|n| n == name) {
                        names.push(name.to_string());
                    }
                }
            }
        }
        names
    }

    /// Reject descriptors that can only come from a programming or config error
    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.name.trim().is_empty() {
            return Err(ProbeError::InvalidDescriptor(
                "service name is empty".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ProbeError::InvalidDescriptor(format!(
                "{}: per-attempt timeout must be non-zero",
                self.name
            )));
        }
        validate_endpoints(&self.name, &self.endpoints)
    }
}

/// Shared endpoint checks for descriptors and config-declared adapters
pub fn validate_endpoints(service: &str, endpoints: &[EndpointSpec]) -> Result<(), ProbeError> {
    let roots = endpoints.iter().filter(|e| e.is_root()).count();
    if roots > 1 {
        return Err(ProbeError::InvalidDescriptor(format!(
            "{}: {} root endpoints declared, at most one allowed",
            service, roots
        )));
    }
    for endpoint in endpoints {
        if !endpoint.path.starts_with('/') {
            return Err(ProbeError::InvalidDescriptor(format!(
                "{}: endpoint path '{}' must start with '/'",
                service, endpoint.path
            )));
        }
        if let Some(namespace) = &endpoint.namespace {
            if !namespace.starts_with('/') {
                return Err(ProbeError::InvalidDescriptor(format!(
                    "{}: namespace '{}' must start with '/'",
                    service, namespace
                )));
            }
        }
    }
    Ok(())
}

/// One planned (endpoint, auth) attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Position in the plan, starting at 0
    pub sequence: usize,
    pub endpoint: EndpointSpec,
    pub auth: AuthStrategy,
    /// 1-based rank of this strategy among the descriptor's strategies of the same mode
    pub ordinal: usize,
}

impl Candidate {
    pub fn label(&self) -> String {
        attempt_label(&self.endpoint.path, self.auth.mode(), self.ordinal)
    }
}

/// Candidate left out of the plan because its credential is not configured
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedCandidate {
    pub endpoint: String,
    pub auth_mode: AuthMode,
    /// Names of the missing variables, never values
    pub missing: Vec<String>,
    #[serde(skip)]
    pub ordinal: usize,
}

impl SkippedCandidate {
    pub fn label(&self) -> String {
        attempt_label(&self.endpoint, self.auth_mode, self.ordinal)
    }
}

/// Label used for `triedEndpoints` and `statusCodes` keys
///
/// The first strategy of a mode is `"/path [basic]"`; later strategies of the
/// same mode get an ordinal, `"/path [basic#2]"`, so every attempt has its own key.
pub fn attempt_label(path: &str, mode: AuthMode, ordinal: usize) -> String {
    if ordinal > 1 {
        format!("{} [{}#{}]", path, mode, ordinal)
    } else {
        format!("{} [{}]", path, mode)
    }
}

/// Why an attempt produced no HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptErrorKind {
    /// DNS, connection or TLS failure
    Network,
    /// The attempt exceeded its own timeout
    Timeout,
    /// The overall deadline fired while the attempt was in flight
    Cancelled,
    /// A planned credential could not be resolved at use time
    CredentialUnavailable,
    /// The request could not be built (bad URL, bad header value)
    InvalidRequest,
}

impl AttemptErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptErrorKind::Network => "network",
            AttemptErrorKind::Timeout => "timeout",
            AttemptErrorKind::Cancelled => "cancelled",
            AttemptErrorKind::CredentialUnavailable => "credential_unavailable",
            AttemptErrorKind::InvalidRequest => "invalid_request",
        }
    }
}

impl fmt::Display for AttemptErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptError {
    pub kind: AttemptErrorKind,
    /// Error text with all secret values scrubbed
    pub message: String,
}

/// Result of one Prober invocation
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptOutcome {
    pub sequence: usize,
    pub endpoint: EndpointSpec,
    pub auth_mode: AuthMode,
    /// Copied from the candidate, keeps labels unique
    pub ordinal: usize,
    /// HTTP status, `None` when no response arrived
    pub status: Option<u16>,
    pub error: Option<AttemptError>,
    pub elapsed: Duration,
    pub rate_limit: Option<RateLimitSnapshot>,
}

impl AttemptOutcome {
    pub fn label(&self) -> String {
        attempt_label(&self.endpoint.path, self.auth_mode, self.ordinal)
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(200..=299))
    }

    pub fn error_kind(&self) -> Option<AttemptErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}

/// Normalized view of a service's self-reported throttling state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u64>,
    /// Epoch seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
    /// Raw header values keyed by lowercase header name, `None` when absent
    pub raw: BTreeMap<String, Option<String>>,
}

impl RateLimitSnapshot {
    /// True when at least one recognized header was present
    pub fn has_signal(&self) -> bool {
        self.raw.values().any(|v| v.is_some())
    }
}

/// Errors that reject a whole probe invocation
///
/// Target-side failures never surface here; they become `AttemptOutcome`s.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("invalid service descriptor: {0}")]
    InvalidDescriptor(String),
}
