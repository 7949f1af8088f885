use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Config, ConfigError};
use crate::core::probe::types::ServiceDescriptor;

#[derive(Parser, Debug)]
#[command(name = "connprobe")]
#[command(version = concat!("Ver:", env!("CARGO_PKG_VERSION")))]
#[command(about = "Connectivity probe for external service health checks")]
pub struct Cli {
    /// Services to probe (default: every enabled service)
    #[arg(value_name = "SERVICE")]
    pub services: Vec<String>,

    /// List known services and their env prefixes
    #[arg(short = 'l', long = "list")]
    pub list: bool,

    /// Config file path (default: ~/.connprobe/config.toml)
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write a default config file
    #[arg(long = "init")]
    pub init: bool,

    /// Print the effective configuration
    #[arg(long = "print")]
    pub print: bool,

    /// Validate the configuration
    #[arg(long = "check")]
    pub check: bool,

    /// Per-attempt timeout, overrides env and config
    #[arg(long = "timeout-ms", value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_ms: Option<u64>,

    /// Overall deadline per service, overrides env and config
    #[arg(long = "deadline-ms", value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub deadline_ms: Option<u64>,

    /// Pretty-print JSON output
    #[arg(short = 'p', long = "pretty")]
    pub pretty: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn load_config(&self) -> Result<Config, ConfigError> {
        match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
    }

    /// Command-line values take precedence over everything else
    pub fn apply_overrides(&self, descriptor: &mut ServiceDescriptor) {
        if let Some(ms) = self.timeout_ms {
            descriptor.timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.deadline_ms {
            descriptor.deadline = Some(Duration::from_millis(ms));
        }
    }
}
