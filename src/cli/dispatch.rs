use super::classify::cmd_classify;
use super::config::cmd_config;
use super::env::CliArgs;
use super::info::cmd_info;
use super::instances::cmd_instances;
use super::simulate::cmd_simulate;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Classify(args) => cmd_classify(args, ctx).await,
        Commands::Instances(args) => cmd_instances(args, ctx).await,
        Commands::Config(args) => cmd_config(args, ctx).await,
        Commands::Simulate(args) => cmd_simulate(args, ctx).await,
        Commands::Info => cmd_info(ctx).await,
    }
}
