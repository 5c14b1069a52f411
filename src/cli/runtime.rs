use std::path::PathBuf;

use anyhow::{Context, Result};
use botflow::EngineConfig;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. `RUST_LOG` wins over `level`; `debug`
/// forces DEBUG. Logs go to stderr so stdout stays machine readable.
pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string().to_lowercase())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

pub struct LoadedConfig {
    pub config: EngineConfig,
    pub path: Option<PathBuf>,
}

/// Load configuration, then apply the `--flows-dir` override.
pub fn load_config(config_path: Option<&PathBuf>, flows_dir: Option<&PathBuf>) -> Result<LoadedConfig> {
    let (mut config, path) =
        EngineConfig::load(config_path.map(PathBuf::as_path)).context("Failed to load configuration")?;
    match &path {
        Some(path) => info!("Loaded configuration from: {}", path.display()),
        None => debug!("No configuration file found, using defaults"),
    }
    if let Some(dir) = flows_dir {
        config.flows_dir = dir.clone();
    }
    Ok(LoadedConfig { config, path })
}
