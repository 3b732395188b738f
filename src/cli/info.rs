use std::time::{Duration, SystemTime};

use anyhow::Result;
use humantime::{format_duration, format_rfc3339_seconds};
use serde::Serialize;

use crate::cli::context::CliContext;
use crate::cli::output::emit_structured;

#[derive(Serialize)]
struct InfoView<'a> {
    version: &'static str,
    build_date: &'static str,
    git_hash: &'static str,
    config_path: String,
    instances: &'a [String],
    coordinator: &'a snauth_helper::CoordinatorConfig,
}

pub async fn cmd_info(ctx: &CliContext) -> Result<()> {
    let config = ctx.config();
    if !ctx.output().is_human() {
        let view = InfoView {
            version: env!("CARGO_PKG_VERSION"),
            build_date: env!("BUILD_DATE"),
            git_hash: env!("GIT_HASH"),
            config_path: ctx.config_path().display().to_string(),
            instances: &config.instances,
            coordinator: &config.coordinator,
        };
        return emit_structured(&view, ctx.output());
    }

    let timings = &config.coordinator;
    println!("snauth System Information");
    println!("=========================");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Build Date: {}", env!("BUILD_DATE"));
    println!("Git Commit: {}", env!("GIT_HASH"));
    println!("Now: {}", format_rfc3339_seconds(SystemTime::now()));
    println!();

    println!("Configuration ({}):", ctx.config_path().display());
    if config.instances.is_empty() {
        println!("- Instances: none");
    } else {
        println!("- Instances:");
        for instance in &config.instances {
            println!("  - {}", instance);
        }
    }
    println!("- Origin family: {}", timings.origin_family.join(", "));
    println!();

    println!("Timings:");
    let rows = [
        ("OAuth re-navigation delay", timings.oauth_renavigate_delay_ms),
        ("OAuth whitelist grace", timings.oauth_cleanup_grace_ms),
        ("Return delay", timings.return_delay_ms),
        ("Admin release grace", timings.admin_release_grace_ms),
        ("Login monitor timeout", timings.login_monitor_timeout_ms),
        ("Prompt countdown", timings.prompt_countdown_ms),
    ];
    for (label, ms) in rows {
        println!("- {}: {}", label, format_duration(Duration::from_millis(ms)));
    }
    println!(
        "- Prompt window: {}x{}",
        timings.prompt_width, timings.prompt_height
    );

    Ok(())
}
