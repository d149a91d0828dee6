use std::{env, sync::Arc};

use proxylink_controller::Controller;
use proxylink_db_memory::MemoryStore;
use proxylink_server::config::load_config_if_present;
use proxylink_storage::ResourceStore;

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From PROXYLINK_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (proxylink.toml)
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (PROXYLINK_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist - it's optional
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    // Initialize tracing early with the default level
    proxylink_server::observability::init_tracing();

    let (config_path, source) = resolve_config_path();

    let cfg = match load_config_if_present(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        path = %config_path,
        source = %source,
        "Configuration loaded"
    );

    proxylink_server::observability::apply_logging_level(&cfg.logging.level);

    let store = Arc::new(MemoryStore::with_event_buffer(cfg.store.event_buffer));
    tracing::info!(
        backend = store.backend_name(),
        field_owner = %cfg.controller.field_owner,
        "Store initialized"
    );

    let controller = Controller::new(
        store.clone() as Arc<dyn ResourceStore>,
        &cfg.controller.field_owner,
        cfg.worker_config(),
    );
    let worker = tokio::spawn(async move { controller.run().await });

    tracing::info!("Controller running, press Ctrl+C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("Failed to listen for shutdown signal: {e}");
    }

    tracing::info!("Shutdown signal received, stopping controller");
    worker.abort();
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: PROXYLINK_CONFIG
/// 3. Default: proxylink.toml
fn resolve_config_path() -> (String, ConfigSource) {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return (path, ConfigSource::CliArgument);
            }
        }
    }

    if let Ok(path) = env::var("PROXYLINK_CONFIG") {
        if !path.is_empty() {
            return (path, ConfigSource::EnvironmentVariable);
        }
    }

    ("proxylink.toml".to_string(), ConfigSource::Default)
}
