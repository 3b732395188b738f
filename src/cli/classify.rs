use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use snauth_helper::{Classification, InstanceRegistry, NavigationClassifier};

use crate::cli::context::CliContext;
use crate::cli::output::emit_structured;

#[derive(Args, Clone, Debug)]
pub struct ClassifyArgs {
    /// URLs to classify
    #[arg(required = true, value_name = "URL")]
    pub urls: Vec<String>,

    /// Trust an extra instance for this invocation only
    #[arg(long = "instance", value_name = "HOST")]
    pub instances: Vec<String>,
}

pub async fn cmd_classify(args: ClassifyArgs, ctx: &CliContext) -> Result<()> {
    let mut instances = ctx.config().instances.clone();
    instances.extend(args.instances);
    let classifier =
        NavigationClassifier::new(Arc::new(InstanceRegistry::with_instances(&instances)));

    let results: Vec<Classification> = args
        .urls
        .iter()
        .map(|url| classifier.classify(url))
        .collect();

    if !ctx.output().is_human() {
        return emit_structured(&results, ctx.output());
    }

    if classifier.registry().is_empty() {
        println!("(no instances configured; nothing is intercepted)");
    }
    for result in &results {
        println!(
            "{} -> {} (trusted={} redirect={})",
            result.url,
            if result.qualifying { "intercept" } else { "allow" },
            yes_no(result.trusted_instance),
            yes_no(result.oauth_redirect)
        );
    }
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
