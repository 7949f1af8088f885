//! Lazy credential and configuration lookup
//!
//! Descriptors only ever hold `SecretRef`s (variable names). Values are looked
//! up through an `EnvSource` at two points:
//!
//! 1. **Plan building** asks whether a credential is *present* so strategies with
//!    missing credentials can be skipped instead of attempted empty.
//! 2. **The Prober** resolves the value immediately before attaching it to one
//!    outgoing request. The value never lands in stored state.
//!
//! ## Lookup Rules
//!
//! - Empty or whitespace-only values are treated as missing
//! - Values are re-read on every lookup; nothing is cached
//! - Reports only ever see `Presence` flags, never values

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fmt;

use crate::core::probe::types::{SecretRef, ServiceDescriptor};

/// Read-only source of configuration values
pub trait EnvSource: Send + Sync {
    /// Return the non-empty value of `name`, if set
    fn var(&self, name: &str) -> Option<String>;
}

/// Process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        match env::var(name) {
            Ok(value) if !value.trim().is_empty() => Some(value),
            _ => None,
        }
    }
}

/// Fixed in-memory values, used by tests and embedders
#[derive(Debug, Default, Clone)]
pub struct MapEnv {
    values: HashMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_string(), value.to_string());
    }

    pub fn remove(&mut self, name: &str) {
        self.values.remove(name);
    }
}

impl EnvSource for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.values
            .get(name)
            .filter(|value| !value.trim().is_empty())
            .cloned()
    }
}

/// Resolved credential value; `Debug` never prints it
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    value: String,
    parts: Vec<String>,
}

impl Secret {
    pub fn new(value: String) -> Self {
        Self {
            value,
            parts: Vec::new(),
        }
    }

    fn pair(key: String, secret: String) -> Self {
        Self {
            value: format!("{}:{}", key, secret),
            parts: vec![key, secret],
        }
    }

    pub fn expose(&self) -> &str {
        &self.value
    }

    /// Every string derived from this secret that must never appear in output
    pub fn fragments(&self) -> Vec<String> {
        let mut fragments = vec![self.value.clone()];
        fragments.extend(self.parts.iter().cloned());
        fragments
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED {} chars])", self.value.len())
    }
}

impl SecretRef {
    /// Variable names this reference reads
    pub fn env_names(&self) -> Vec<&str> {
        match self {
            SecretRef::Env(name) => vec![name.as_str()],
            SecretRef::Pair { key, secret } => vec![key.as_str(), secret.as_str()],
        }
    }

    /// Names of variables that are currently unset or empty
    pub fn missing(&self, env: &dyn EnvSource) -> Vec<String> {
        self.env_names()
            .into_iter()
            .filter(|name| env.var(name).is_none())
            .map(str::to_string)
            .collect()
    }

    /// Resolve the value right before use
    pub fn resolve(&self, env: &dyn EnvSource) -> Option<Secret> {
        match self {
            SecretRef::Env(name) => env.var(name).map(|v| Secret::new(v.trim().to_string())),
            SecretRef::Pair { key, secret } => {
                let key = env.var(key)?;
                let secret = env.var(secret)?;
                Some(Secret::pair(key.trim().to_string(), secret.trim().to_string()))
            }
        }
    }
}

/// Presence flag reported for a configuration variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Present,
    Missing,
}

/// `present`/`missing` flag for every variable the descriptor depends on
pub fn presence_flags(
    descriptor: &ServiceDescriptor,
    env: &dyn EnvSource,
) -> BTreeMap<String, Presence> {
    descriptor
        .env_names()
        .into_iter()
        .map(|name| {
            let presence = if env.var(&name).is_some() {
                Presence::Present
            } else {
                Presence::Missing
            };
            (name, presence)
        })
        .collect()
}

/// Replace every occurrence of each fragment with `[REDACTED]`
///
/// Longer fragments are replaced first so a pair's joined form is not left
/// half-redacted by its components.
pub fn scrub_secrets(text: &str, fragments: &[String]) -> String {
    let mut sorted: Vec<&String> = fragments.iter().filter(|f| !f.is_empty()).collect();
    sorted.sort_by_key(|f| std::cmp::Reverse(f.len()));

    let mut scrubbed = text.to_string();
    for fragment in sorted {
        scrubbed = scrubbed.replace(fragment.as_str(), "[REDACTED]");
    }
    scrubbed
}
