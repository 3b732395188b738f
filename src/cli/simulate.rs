use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Args;
use humantime::format_duration;
use snauth_helper::scenario::{simulate, Scenario, ScenarioReport};
use snauth_helper::CoordinatorEvent;

use crate::cli::context::CliContext;
use crate::cli::output::emit_structured;

#[derive(Args, Clone, Debug)]
pub struct SimulateArgs {
    /// Scenario file (YAML)
    #[arg(value_name = "FILE")]
    pub scenario: PathBuf,
}

pub async fn cmd_simulate(args: SimulateArgs, ctx: &CliContext) -> Result<()> {
    let scenario = Scenario::load(&args.scenario).await?;
    let config = ctx.config().clone();

    // The replay owns a paused-clock runtime of its own, so it runs off this runtime's threads.
    let replay = std::thread::spawn(move || simulate(&scenario, &config));
    let report = tokio::task::spawn_blocking(move || replay.join())
        .await?
        .map_err(|_| anyhow!("simulation thread panicked"))??;

    if !ctx.output().is_human() {
        return emit_structured(&report, ctx.output());
    }
    print_report(&report);
    Ok(())
}

fn print_report(report: &ScenarioReport) {
    println!(
        "Scenario: {} ({} simulated)",
        report.name.as_deref().unwrap_or("unnamed"),
        at(report.elapsed_ms)
    );

    println!();
    println!("Requests:");
    for request in &report.requests {
        println!(
            "  +{} step {} tab {} {} -> {}",
            at(request.at_ms),
            request.step,
            request.tab,
            request.url,
            if request.cancelled { "cancelled" } else { "allowed" }
        );
    }

    println!();
    println!("Events:");
    for timed in &report.events {
        println!("  +{} {}", at(timed.at_ms), describe(&timed.event));
    }

    println!();
    println!("Navigations:");
    if report.navigations.is_empty() {
        println!("  (none)");
    }
    for navigation in &report.navigations {
        println!("  tab {} -> {}", navigation.tab, navigation.url);
    }
    println!("Prompts opened: {}", report.prompts.len());

    println!();
    if report.state.is_empty() {
        println!("Final state: clean");
    } else {
        println!("Final state:");
        for tab in &report.state.tabs {
            println!(
                "  tab {} intercepted={} oauth={} admin={}",
                tab.tab,
                tab.record.is_some(),
                tab.oauth_whitelisted,
                tab.admin_login
            );
        }
    }
}

fn at(ms: u64) -> String {
    if ms == 0 {
        return "0ms".to_string();
    }
    format_duration(Duration::from_millis(ms)).to_string()
}

/// `name key=value ...`, built from the event's serialized form.
fn describe(event: &CoordinatorEvent) -> String {
    let Ok(serde_json::Value::Object(mut fields)) = serde_json::to_value(event) else {
        return format!("{:?}", event);
    };
    let name = fields
        .remove("event")
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_default();
    let details: Vec<String> = fields
        .into_iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(text) => format!("{key}={text}"),
            other => format!("{key}={other}"),
        })
        .collect();
    if details.is_empty() {
        name
    } else {
        format!("{} {}", name, details.join(" "))
    }
}
