use super::types::{default_timeout_ms, Config};

impl Default for Config {
    fn default() -> Self {
        Config {
            default_timeout_ms: default_timeout_ms(),
            deadline_ms: None,
            disabled: Vec::new(),
            services: Vec::new(),
        }
    }
}
