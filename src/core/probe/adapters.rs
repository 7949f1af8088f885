//! Declarative per-service adapters
//!
//! An adapter is data only: identity, env prefix, endpoint list and the auth
//! strategies the service accepts. Turning an adapter into a
//! `ServiceDescriptor` reads the base URL and timeouts from the environment;
//! credentials stay as references.
//!
//! Built-in adapters:
//!
//! | Name           | Prefix         | Root       | Namespace          |
//! |----------------|----------------|------------|--------------------|
//! | `commerce`     | `COMMERCE`     | `/wp-json` | `/wp-json/wc/v3`   |
//! | `crm`          | `CRM`          | `/`        | `/api/v1`          |
//! | `custom_fields`| `CUSTOM_FIELDS`| `/wp-json` | `/wp-json/acf/v3`  |
//! | `lms`          | `LMS`          | `/wp-json` | `/wp-json/ldlms/v2`|
//! | `email`        | `EMAIL`        | `/`        | `/v3`              |
//! | `chat_webhook` | `CHAT_WEBHOOK` | `/`        | `/api`             |
//! | `analytics`    | `ANALYTICS`    | `/`        | `/api`             |

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::probe::secret::EnvSource;
use crate::core::probe::types::{
    validate_endpoints, AuthStrategy, EndpointSpec, ProbeError, SecretRef, ServiceDescriptor,
    DEFAULT_TIMEOUT_MS,
};

/// Defaults applied when the environment does not override them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeDefaults {
    pub timeout: Duration,
    pub deadline: Option<Duration>,
}

impl Default for ProbeDefaults {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            deadline: None,
        }
    }
}

/// Declarative description of one probed service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAdapter {
    pub name: String,
    /// Defaults to the upper-cased name with `-` replaced by `_`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_prefix: Option<String>,
    pub endpoints: Vec<EndpointSpec>,
    #[serde(default)]
    pub auth: Vec<AuthStrategy>,
}

impl ServiceAdapter {
    pub fn prefix(&self) -> String {
        self.env_prefix
            .clone()
            .unwrap_or_else(|| self.name.to_uppercase().replace('-', "_"))
    }

    pub fn env_var(&self, suffix: &str) -> String {
        format!("{}_{}", self.prefix(), suffix)
    }

    /// Build a fresh descriptor from the current environment
    ///
    /// `<PREFIX>_TIMEOUT_MS` and `<PREFIX>_DEADLINE_MS` override the defaults
    /// when they hold a positive integer; anything else falls back silently.
    pub fn descriptor(&self, env: &dyn EnvSource, defaults: &ProbeDefaults) -> ServiceDescriptor {
        let timeout = parse_millis(env.var(&self.env_var("TIMEOUT_MS"))).unwrap_or(defaults.timeout);
        let deadline = parse_millis(env.var(&self.env_var("DEADLINE_MS"))).or(defaults.deadline);

        ServiceDescriptor {
            name: self.name.clone(),
            env_prefix: self.prefix(),
            base_url: env.var(&self.env_var("BASE_URL")).map(|v| v.trim().to_string()),
            endpoints: self.endpoints.clone(),
            auth: self.auth.clone(),
            timeout,
            deadline,
        }
    }

    /// Structural checks that do not depend on the environment
    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.name.trim().is_empty() {
            return Err(ProbeError::InvalidDescriptor(
                "service name is empty".to_string(),
            ));
        }
        let prefix = self.prefix();
        if prefix.is_empty()
            || !prefix
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(ProbeError::InvalidDescriptor(format!(
                "{}: env prefix '{}' must be upper-case letters, digits or '_'",
                self.name, prefix
            )));
        }
        validate_endpoints(&self.name, &self.endpoints)
    }
}

fn parse_millis(value: Option<String>) -> Option<Duration> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

fn env_ref(prefix: &str, suffix: &str) -> SecretRef {
    SecretRef::Env(format!("{}_{}", prefix, suffix))
}

fn adapter(name: &str, prefix: &str, endpoints: Vec<EndpointSpec>, auth: Vec<AuthStrategy>) -> ServiceAdapter {
    ServiceAdapter {
        name: name.to_string(),
        env_prefix: Some(prefix.to_string()),
        endpoints,
        auth,
    }
}

/// Commerce platform REST API (consumer key/secret or pre-encoded basic auth)
pub fn commerce() -> ServiceAdapter {
    let p = "COMMERCE";
    adapter(
        "commerce",
        p,
        vec![
            EndpointSpec::root("/wp-json"),
            EndpointSpec::namespace("/wp-json/wc/v3"),
            EndpointSpec::resource_list("/wp-json/wc/v3/products", "/wp-json/wc/v3"),
        ],
        vec![
            AuthStrategy::Basic {
                credential: SecretRef::Pair {
                    key: format!("{}_CONSUMER_KEY", p),
                    secret: format!("{}_CONSUMER_SECRET", p),
                },
            },
            AuthStrategy::Basic {
                credential: env_ref(p, "BASIC_AUTH"),
            },
            AuthStrategy::None,
        ],
    )
}

/// CRM REST API
pub fn crm() -> ServiceAdapter {
    let p = "CRM";
    adapter(
        "crm",
        p,
        vec![
            EndpointSpec::root("/"),
            EndpointSpec::namespace("/api/v1"),
            EndpointSpec::resource_list("/api/v1/contacts", "/api/v1"),
        ],
        vec![
            AuthStrategy::Bearer {
                token: env_ref(p, "API_KEY"),
            },
            AuthStrategy::Basic {
                credential: env_ref(p, "BASIC_AUTH"),
            },
            AuthStrategy::None,
        ],
    )
}

/// Custom-fields REST namespace on a CMS
pub fn custom_fields() -> ServiceAdapter {
    let p = "CUSTOM_FIELDS";
    adapter(
        "custom_fields",
        p,
        vec![
            EndpointSpec::root("/wp-json"),
            EndpointSpec::namespace("/wp-json/acf/v3"),
            EndpointSpec::resource_list("/wp-json/acf/v3/posts", "/wp-json/acf/v3"),
        ],
        vec![
            AuthStrategy::Bearer {
                token: env_ref(p, "API_KEY"),
            },
            AuthStrategy::Basic {
                credential: env_ref(p, "BASIC_AUTH"),
            },
            AuthStrategy::None,
        ],
    )
}

/// Learning-management REST API
pub fn lms() -> ServiceAdapter {
    let p = "LMS";
    adapter(
        "lms",
        p,
        vec![
            EndpointSpec::root("/wp-json"),
            EndpointSpec::namespace("/wp-json/ldlms/v2"),
            EndpointSpec::resource_list("/wp-json/ldlms/v2/sfwd-courses", "/wp-json/ldlms/v2"),
        ],
        vec![
            AuthStrategy::Basic {
                credential: env_ref(p, "BASIC_AUTH"),
            },
            AuthStrategy::Bearer {
                token: env_ref(p, "API_KEY"),
            },
            AuthStrategy::None,
        ],
    )
}

/// Transactional email delivery API
pub fn email() -> ServiceAdapter {
    let p = "EMAIL";
    adapter(
        "email",
        p,
        vec![
            EndpointSpec::root("/"),
            EndpointSpec::resource_list("/v3/account", "/v3"),
        ],
        vec![
            AuthStrategy::ApiKeyHeader {
                name: "api-key".to_string(),
                token: env_ref(p, "API_KEY"),
            },
            AuthStrategy::Bearer {
                token: env_ref(p, "API_KEY"),
            },
            AuthStrategy::None,
        ],
    )
}

/// Chat platform incoming-webhook API
pub fn chat_webhook() -> ServiceAdapter {
    let p = "CHAT_WEBHOOK";
    adapter(
        "chat_webhook",
        p,
        vec![
            EndpointSpec::root("/"),
            EndpointSpec::resource_list("/api/webhooks", "/api"),
        ],
        vec![
            AuthStrategy::Bearer {
                token: env_ref(p, "API_KEY"),
            },
            AuthStrategy::ApiKeyQuery {
                name: "token".to_string(),
                token: env_ref(p, "API_KEY"),
            },
            AuthStrategy::None,
        ],
    )
}

/// Analytics event-ingestion API
pub fn analytics() -> ServiceAdapter {
    let p = "ANALYTICS";
    adapter(
        "analytics",
        p,
        vec![
            EndpointSpec::root("/"),
            EndpointSpec::namespace("/api"),
            EndpointSpec::resource_list("/api/projects", "/api"),
        ],
        vec![
            AuthStrategy::ApiKeyHeader {
                name: "x-api-key".to_string(),
                token: env_ref(p, "API_KEY"),
            },
            AuthStrategy::ApiKeyQuery {
                name: "api_key".to_string(),
                token: env_ref(p, "API_KEY"),
            },
            AuthStrategy::None,
        ],
    )
}

/// All built-in adapters, in a stable order
pub fn builtin_adapters() -> Vec<ServiceAdapter> {
    vec![
        commerce(),
        crm(),
        custom_fields(),
        lms(),
        email(),
        chat_webhook(),
        analytics(),
    ]
}

pub fn find_builtin(name: &str) -> Option<ServiceAdapter> {
    builtin_adapters()
        .into_iter()
        .find(|a| a.name.eq_ignore_ascii_case(name))
}
