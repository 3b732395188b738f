//! Timing and scoping knobs for the coordinator.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Registrable domains whose top-level navigations reach the interception hook.
    pub origin_family: Vec<String>,
    /// Pause before replaying the redirect so it does not race the cancellation.
    pub oauth_renavigate_delay_ms: u64,
    /// How long an OAuth tab stays whitelisted after the redirect was replayed.
    pub oauth_cleanup_grace_ms: u64,
    /// Pause between detecting login completion and returning to the original page.
    pub return_delay_ms: u64,
    /// How long a tab stays exempt after the admin login finished.
    pub admin_release_grace_ms: u64,
    /// Upper bound on how long a login is watched.
    pub login_monitor_timeout_ms: u64,
    /// Countdown shown by the prompt before it picks OAuth on its own.
    pub prompt_countdown_ms: u64,
    pub prompt_width: u32,
    pub prompt_height: u32,
    /// Capacity of the observer and tab event channels.
    pub event_buffer: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            origin_family: vec!["service-now.com".to_string()],
            oauth_renavigate_delay_ms: 100,
            oauth_cleanup_grace_ms: 10_000,
            return_delay_ms: 500,
            admin_release_grace_ms: 3_000,
            login_monitor_timeout_ms: 5 * 60 * 1000,
            prompt_countdown_ms: 10_000,
            prompt_width: 500,
            prompt_height: 400,
            event_buffer: 256,
        }
    }
}

impl CoordinatorConfig {
    pub fn oauth_renavigate_delay(&self) -> Duration {
        Duration::from_millis(self.oauth_renavigate_delay_ms)
    }

    pub fn oauth_cleanup_grace(&self) -> Duration {
        Duration::from_millis(self.oauth_cleanup_grace_ms)
    }

    pub fn return_delay(&self) -> Duration {
        Duration::from_millis(self.return_delay_ms)
    }

    pub fn admin_release_grace(&self) -> Duration {
        Duration::from_millis(self.admin_release_grace_ms)
    }

    pub fn login_monitor_timeout(&self) -> Duration {
        Duration::from_millis(self.login_monitor_timeout_ms)
    }

    pub fn prompt_countdown(&self) -> Duration {
        Duration::from_millis(self.prompt_countdown_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: CoordinatorConfig =
            serde_json::from_str(r#"{ "return_delay_ms": 50 }"#).expect("parse");
        assert_eq!(config.return_delay(), Duration::from_millis(50));
        assert_eq!(config.login_monitor_timeout(), Duration::from_secs(300));
        assert_eq!(config.origin_family, vec!["service-now.com".to_string()]);
    }
}
