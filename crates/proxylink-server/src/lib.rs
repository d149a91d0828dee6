pub mod config;
pub mod observability;

pub use config::{AppConfig, ConfigError, load_config, load_config_if_present};
