use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::{Config, ConfigError};
use crate::core::probe::adapters::{builtin_adapters, ProbeDefaults, ServiceAdapter};

const CONFIG_HEADER: &str = "\
# connprobe configuration
#
# Per-service environment variables (<PREFIX>_BASE_URL, <PREFIX>_TIMEOUT_MS,
# <PREFIX>_DEADLINE_MS, credentials) always win over the values below.
#
# Custom adapters:
#
# [[services]]
# name = \"inventory\"
# env_prefix = \"INVENTORY\"
# endpoints = [
#   { path = \"/\", role = \"root\" },
#   { path = \"/api/v2/items\", role = \"resource_list\", namespace = \"/api/v2\" },
# ]
# auth = [
#   { kind = \"bearer\", token = \"INVENTORY_API_KEY\" },
#   { kind = \"none\" },
# ]

";

impl Config {
    /// `~/.connprobe/config.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".connprobe").join("config.toml"))
            .ok_or(ConfigError::NoHomeDir)
    }

    /// Load from the default location; a missing file yields the defaults
    pub fn load() -> Result<Config, ConfigError> {
        let path = Self::default_path()?;
        if !path.exists() {
            return Ok(Config::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path, which must exist
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write a default config to `~/.connprobe/config.toml`
    pub fn init() -> Result<PathBuf, ConfigError> {
        let path = Self::default_path()?;
        Self::init_at(&path)?;
        Ok(path)
    }

    /// Write a default config to `path`, refusing to overwrite
    pub fn init_at(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = format!("{}{}", CONFIG_HEADER, Config::default().to_toml()?);
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn print(&self) -> Result<(), ConfigError> {
        print!("{}", self.to_toml()?);
        Ok(())
    }

    /// Validate settings and every adapter the config can produce
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.default_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "default_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.deadline_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "deadline_ms must be greater than zero when set".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for adapter in &self.services {
            adapter.validate()?;
            if !seen.insert(adapter.name.to_ascii_lowercase()) {
                return Err(ConfigError::Invalid(format!(
                    "service '{}' is declared more than once",
                    adapter.name
                )));
            }
        }

        let known = self.all_adapters();
        for name in &self.disabled {
            if !known.iter().any(|a| a.name.eq_ignore_ascii_case(name)) {
                return Err(ConfigError::UnknownService(name.clone()));
            }
        }
        Ok(())
    }

    /// Built-ins merged with config-declared adapters, disabled ones included
    pub fn all_adapters(&self) -> Vec<ServiceAdapter> {
        let mut adapters: Vec<ServiceAdapter> = builtin_adapters()
            .into_iter()
            .filter(|b| {
                !self
                    .services
                    .iter()
                    .any(|s| s.name.eq_ignore_ascii_case(&b.name))
            })
            .collect();
        adapters.extend(self.services.iter().cloned());
        adapters
    }

    /// Adapters probed when no service is named
    pub fn adapters(&self) -> Vec<ServiceAdapter> {
        self.all_adapters()
            .into_iter()
            .filter(|a| !self.is_disabled(&a.name))
            .collect()
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.iter().any(|d| d.eq_ignore_ascii_case(name))
    }

    /// Resolve requested names; an empty request means every enabled adapter.
    /// Explicitly named services are probed even when disabled.
    pub fn select(&self, names: &[String]) -> Result<Vec<ServiceAdapter>, ConfigError> {
        if names.is_empty() {
            return Ok(self.adapters());
        }
        let all = self.all_adapters();
        names
            .iter()
            .map(|name| {
                all.iter()
                    .find(|a| a.name.eq_ignore_ascii_case(name))
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownService(name.clone()))
            })
            .collect()
    }

    pub fn defaults(&self) -> ProbeDefaults {
        let fallback = ProbeDefaults::default();
        ProbeDefaults {
            timeout: if self.default_timeout_ms > 0 {
                Duration::from_millis(self.default_timeout_ms)
            } else {
                fallback.timeout
            },
            deadline: self
                .deadline_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
        }
    }
}
