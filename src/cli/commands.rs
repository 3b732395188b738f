use clap::Subcommand;

use super::classify::ClassifyArgs;
use super::config::ConfigArgs;
use super::instances::InstancesArgs;
use super::simulate::SimulateArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Show how the helper would treat one or more URLs
    Classify(ClassifyArgs),

    /// Manage the trusted ServiceNow instances
    Instances(InstancesArgs),

    /// Inspect the configuration file
    Config(ConfigArgs),

    /// Replay a scripted browser session against the coordinator
    Simulate(SimulateArgs),

    /// Show build and configuration information
    Info,
}
