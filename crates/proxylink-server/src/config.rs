use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use proxylink_controller::WorkerConfig;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub controller: ControllerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.controller.field_owner.is_empty() {
            return Err("controller.field_owner must not be empty".into());
        }
        if self.controller.max_attempts == 0 {
            return Err("controller.max_attempts must be > 0".into());
        }
        if self.store.event_buffer == 0 {
            return Err("store.event_buffer must be > 0".into());
        }
        if self.store.backend != "memory" {
            return Err(format!(
                "store.backend {:?} is not supported (only \"memory\")",
                self.store.backend
            ));
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            max_attempts: self.controller.max_attempts,
            retry_delay: Duration::from_millis(self.controller.retry_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerSettings {
    /// Writer tag stamped on every store update this controller performs.
    #[serde(default = "default_field_owner")]
    pub field_owner: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            field_owner: default_field_owner(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            event_buffer: default_event_buffer(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_field_owner() -> String {
    "proxylink".to_string()
}
fn default_max_attempts() -> u32 {
    5
}
fn default_retry_delay_ms() -> u64 {
    200
}
fn default_backend() -> String {
    "memory".to_string()
}
fn default_event_buffer() -> usize {
    1024
}
fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Load and validate configuration.
///
/// With `Some(path)` the file must exist and parse. With `None` the
/// defaults are used.
pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let cfg = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_string(),
                source,
            })?;
            toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_string(),
                source,
            })?
        }
        None => AppConfig::default(),
    };
    cfg.validate().map_err(ConfigError::Invalid)?;
    Ok(cfg)
}

/// Load from `path` if the file exists, otherwise fall back to defaults.
/// Used for the implicit default path, which is optional.
pub fn load_config_if_present(path: &str) -> Result<AppConfig, ConfigError> {
    if Path::new(path).exists() {
        load_config(Some(path))
    } else {
        load_config(None)
    }
}
