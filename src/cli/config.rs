use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use snauth_helper::Config;
use tokio::fs;

use crate::cli::context::CliContext;
use crate::cli::output::{emit_structured, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Print the configuration file path in use
    Path,

    /// Validate the configuration file
    Validate,
}

#[derive(Serialize)]
struct ValidationView {
    path: String,
    exists: bool,
    instances: usize,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    let path = ctx.config_path();
    match args.action {
        ConfigAction::Show => match ctx.output() {
            OutputFormat::Human => {
                println!("Current configuration ({}):", path.display());
                println!("{}", serde_yaml::to_string(ctx.config())?);
            }
            other => emit_structured(ctx.config(), other)?,
        },
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Validate => {
            let exists = fs::try_exists(path).await?;
            let instances = if exists {
                let raw = fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?;
                let config: Config = serde_yaml::from_str(&raw)
                    .with_context(|| format!("parsing {}", path.display()))?;
                config
                    .validate()
                    .with_context(|| format!("validating {}", path.display()))?;
                config.instances.len()
            } else {
                0
            };

            if !ctx.output().is_human() {
                let view = ValidationView {
                    path: path.display().to_string(),
                    exists,
                    instances,
                };
                return emit_structured(&view, ctx.output());
            }
            if exists {
                println!(
                    "Configuration file {} is valid ({} instance(s))",
                    path.display(),
                    instances
                );
            } else {
                println!(
                    "No configuration file at {}; nothing is intercepted until instances are added",
                    path.display()
                );
            }
        }
    }

    Ok(())
}
