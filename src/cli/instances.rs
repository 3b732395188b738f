use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use snauth_helper::config::save_config;
use snauth_helper::Config;
use tracing::info;

use crate::cli::context::CliContext;
use crate::cli::output::emit_structured;

#[derive(Args, Clone, Debug)]
pub struct InstancesArgs {
    #[command(subcommand)]
    pub action: InstancesAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum InstancesAction {
    /// List trusted instances
    List,

    /// Add instances (e.g. acme.service-now.com)
    Add {
        #[arg(required = true, value_name = "HOST")]
        hosts: Vec<String>,
    },

    /// Remove instances
    Remove {
        #[arg(required = true, value_name = "HOST")]
        hosts: Vec<String>,
    },

    /// Replace the whole list
    Set {
        #[arg(required = true, value_name = "HOST")]
        hosts: Vec<String>,
    },
}

#[derive(Serialize)]
struct InstancesView<'a> {
    path: String,
    instances: &'a [String],
}

pub async fn cmd_instances(args: InstancesArgs, ctx: &CliContext) -> Result<()> {
    let path = ctx.config_path();
    let mut config: Config = ctx.config().clone();

    let changed = match args.action {
        InstancesAction::List => false,
        InstancesAction::Add { hosts } => {
            config.add_instances(&hosts)?;
            true
        }
        InstancesAction::Remove { hosts } => {
            let removed = config.remove_instances(&hosts)?;
            if removed == 0 && ctx.output().is_human() {
                println!("No matching instances to remove");
            }
            removed > 0
        }
        InstancesAction::Set { hosts } => {
            config.set_instances(&hosts)?;
            true
        }
    };

    if changed {
        save_config(path, &config)
            .await
            .with_context(|| format!("saving {}", path.display()))?;
        info!(count = config.instances.len(), "instances updated");
    }

    if !ctx.output().is_human() {
        let view = InstancesView {
            path: path.display().to_string(),
            instances: &config.instances,
        };
        return emit_structured(&view, ctx.output());
    }

    if changed {
        println!(
            "Saved {} instance(s) to {}",
            config.instances.len(),
            path.display()
        );
    }
    if config.instances.is_empty() {
        println!("No instances configured yet");
    } else {
        for instance in &config.instances {
            println!("- {}", instance);
        }
    }
    Ok(())
}
