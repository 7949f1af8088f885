pub mod defaults;
pub mod loader;
pub mod types;

pub use types::{Config, ConfigError};
