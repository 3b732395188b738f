//! On-disk configuration: the trusted instance list plus coordinator timings.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use snauth_coordinator::CoordinatorConfig;
use snauth_navigation::{normalize_instances, validate_instances, InstanceRegistry, RegistryError};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

pub const CONFIG_DIR_NAME: &str = "snauth";
pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const LOCAL_CONFIG_PATH: &str = "config/config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] serde_yaml::Error),
    #[error(transparent)]
    Instances(#[from] RegistryError),
    #[error("no configuration directory available on this platform")]
    NoConfigDir,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Hostnames (or fragments of them) of the ServiceNow instances to guard.
    pub instances: Vec<String>,
    pub coordinator: CoordinatorConfig,
}

impl Config {
    /// Registry seeded from the stored list, the way the helper reads it at startup.
    pub fn registry(&self) -> Arc<InstanceRegistry> {
        Arc::new(InstanceRegistry::with_instances(&self.instances))
    }

    /// Validate and store a new instance list, as the settings page does on save.
    pub fn set_instances<I, S>(&mut self, instances: I) -> Result<usize, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let validated = validate_instances(instances)?;
        let count = validated.len();
        self.instances = validated;
        Ok(count)
    }

    pub fn add_instances<I, S>(&mut self, instances: I) -> Result<usize, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut merged = self.instances.clone();
        merged.extend(instances.into_iter().map(|s| s.as_ref().to_string()));
        self.set_instances(merged)
    }

    /// Remove entries (compared after normalisation). Returns how many were dropped.
    pub fn remove_instances<I, S>(&mut self, instances: I) -> Result<usize, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let doomed = normalize_instances(instances);
        let (dropped, remaining): (Vec<String>, Vec<String>) =
            normalize_instances(&self.instances)
                .into_iter()
                .partition(|entry| doomed.contains(entry));
        let removed = dropped.len();
        self.set_instances(remaining)?;
        Ok(removed)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_instances(&self.instances)?;
        Ok(())
    }
}

/// `--config` wins, then `./config/config.yaml`, then the per-user config directory.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let local = PathBuf::from(LOCAL_CONFIG_PATH);
    if local.exists() {
        return Ok(local);
    }
    let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    path.push(CONFIG_DIR_NAME);
    path.push(CONFIG_FILE_NAME);
    Ok(path)
}

/// Load the file at `path`; a missing file yields the defaults.
pub async fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let exists = fs::try_exists(path).await.map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if !exists {
        warn!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let config = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "loaded configuration");
    Ok(config)
}

pub async fn save_config(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    let serialized = serde_yaml::to_string(config)?;
    fs::write(path, serialized)
        .await
        .map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    info!(path = %path.display(), "saved configuration");
    Ok(())
}
