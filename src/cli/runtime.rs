use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use snauth_helper::config::{self, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// `RUST_LOG` wins; otherwise `--log-level`, forced to DEBUG by `--debug`. Logs go to stderr.
pub fn init_logging(level: &str, debug: bool, json: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

pub struct LoadedConfig {
    pub config: Config,
    pub path: PathBuf,
}

pub async fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = config::resolve_config_path(explicit).context("Failed to locate config file")?;
    let config = config::load_config(&path)
        .await
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    Ok(LoadedConfig { config, path })
}
