//! ServiceNow auth helper.
//!
//! The runtime pieces live in the workspace crates; this crate adds the on-disk configuration and
//! the scenario simulator used by the `snauth` binary.

pub mod config;
pub mod scenario;

pub use config::{Config, ConfigError};
pub use scenario::{simulate, Scenario, ScenarioError, ScenarioReport};
pub use snauth_coordinator::{Coordinator, CoordinatorConfig, CoordinatorEvent};
pub use snauth_navigation::{Classification, InstanceRegistry, NavigationClassifier};
