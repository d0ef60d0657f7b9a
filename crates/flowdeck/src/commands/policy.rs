//! Policy command - evaluates a policy script against fixtures.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use serde_json::Value;

use flowdeck_policy::{EvaluationInput, EvaluationOutcome, EvaluatorConfig, PolicyEvaluator};

/// Arguments for the policy command.
#[derive(Args, Debug)]
pub struct PolicyArgs {
    /// Path to the policy script
    pub script: PathBuf,

    /// User fixture as inline JSON
    #[arg(long, default_value = "{}")]
    pub user: String,

    /// Action fixture as inline JSON
    #[arg(long, default_value = "{}")]
    pub action: String,

    /// Context fixture as inline JSON
    #[arg(long)]
    pub context: Option<String>,

    /// Execution budget in milliseconds
    #[arg(long, default_value_t = 5000)]
    pub budget_ms: u64,

    /// Directory for compiled policy artifacts (defaults to the data directory)
    #[arg(long)]
    pub cache: Option<PathBuf>,
}

pub async fn run(args: PolicyArgs) -> Result<()> {
    let code = std::fs::read_to_string(&args.script)
        .with_context(|| format!("reading {}", args.script.display()))?;

    let user: Value = serde_json::from_str(&args.user).context("parsing --user fixture")?;
    let action: Value = serde_json::from_str(&args.action).context("parsing --action fixture")?;

    let mut input = EvaluationInput::new(code, user, action);
    if let Some(context) = &args.context {
        input = input.with_context(serde_json::from_str(context).context("parsing --context fixture")?);
    }

    let cache_dir = args
        .cache
        .unwrap_or_else(|| super::data_dir().join("policy-cache"));
    let config = EvaluatorConfig::new(cache_dir)
        .with_budget(std::time::Duration::from_millis(args.budget_ms));
    let evaluator = PolicyEvaluator::new(config).context("creating policy evaluator")?;

    let outcome = evaluator.evaluate(&input).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    // Non-zero exit for mechanism failures so scripts can gate on it.
    if let EvaluationOutcome::Failure(_) = outcome {
        std::process::exit(1);
    }
    Ok(())
}
