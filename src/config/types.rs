use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::probe::adapters::ServiceAdapter;
use crate::core::probe::types::ProbeError;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Per-attempt timeout used when `<SERVICE>_TIMEOUT_MS` is unset
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    /// Overall budget for one service's plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
    /// Service names excluded from "probe everything" runs
    #[serde(default)]
    pub disabled: Vec<String>,
    /// Extra adapters; a name matching a built-in replaces it
    #[serde(default)]
    pub services: Vec<ServiceAdapter>,
}

pub(crate) fn default_timeout_ms() -> u64 {
    crate::core::probe::types::DEFAULT_TIMEOUT_MS
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHomeDir,
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("config already exists at {0}")]
    AlreadyExists(PathBuf),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("unknown service '{0}'")]
    UnknownService(String),
    #[error(transparent)]
    Adapter(#[from] ProbeError),
}
