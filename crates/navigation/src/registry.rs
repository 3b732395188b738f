//! Trusted instance registry.
//!
//! The registry is owned by whoever persists the settings; the coordinator only reads it, except
//! when an `updateInstances` message replaces the whole list.

use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use crate::patterns::SERVICE_NOW_DOMAIN;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("at least one instance is required")]
    Empty,
    #[error("invalid instance: {0}. Must be a .service-now.com domain")]
    InvalidInstance(String),
}

/// Ordered set of hostname substrings identifying trusted instances.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    entries: RwLock<Vec<String>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instances<I, S>(instances: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            entries: RwLock::new(normalize_instances(instances)),
        }
    }

    /// Replace the registry contents wholesale. Returns the number of entries kept.
    pub fn replace<I, S>(&self, instances: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let normalized = normalize_instances(instances);
        let count = normalized.len();
        *self.entries.write() = normalized;
        debug!(count, "instance registry replaced");
        count
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// True when `host` contains at least one registered entry.
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.entries
            .read()
            .iter()
            .any(|entry| host.contains(entry.as_str()))
    }
}

/// Trim, lowercase, drop empty entries and duplicates while keeping first-seen order.
pub fn normalize_instances<I, S>(instances: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for raw in instances {
        let entry = raw.as_ref().trim().to_ascii_lowercase();
        if entry.is_empty() || out.contains(&entry) {
            continue;
        }
        out.push(entry);
    }
    out
}

/// Validation applied before a settings save is persisted.
pub fn validate_instances<I, S>(instances: I) -> Result<Vec<String>, RegistryError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let normalized = normalize_instances(instances);
    if normalized.is_empty() {
        return Err(RegistryError::Empty);
    }
    if let Some(bad) = normalized
        .iter()
        .find(|entry| !entry.contains(SERVICE_NOW_DOMAIN))
    {
        return Err(RegistryError::InvalidInstance(bad.clone()));
    }
    Ok(normalized)
}
