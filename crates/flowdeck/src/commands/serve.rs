//! Serve command - runs the Flowdeck API server.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::info;

use flowdeck_policy::{EvaluatorConfig, PolicyEvaluator};
use flowdeck_server::{AppState, Server, ServerConfig};
use flowdeck_store::WorkflowStore;

/// Arguments for the serve command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Path to the SQLite database (defaults to the data directory)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// API token for authentication (or set FLOWDECK_API_TOKEN env var)
    #[arg(long, env = "FLOWDECK_API_TOKEN")]
    pub token: Option<String>,

    /// Directory for compiled policy artifacts (defaults to the data directory)
    #[arg(long)]
    pub policy_cache: Option<PathBuf>,

    /// Policy execution budget in milliseconds
    #[arg(long, default_value_t = 5000)]
    pub policy_budget_ms: u64,

    /// Disable rate limiting
    #[arg(long)]
    pub no_rate_limit: bool,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    let data_dir = super::data_dir();

    let db_path = args.db.unwrap_or_else(|| data_dir.join("flowdeck.db"));
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let store = WorkflowStore::open(&db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;

    let cache_dir = args
        .policy_cache
        .unwrap_or_else(|| data_dir.join("policy-cache"));
    let evaluator_config = EvaluatorConfig::new(cache_dir)
        .with_budget(std::time::Duration::from_millis(args.policy_budget_ms));
    let evaluator = PolicyEvaluator::new(evaluator_config).context("creating policy evaluator")?;

    if args.token.is_none() {
        info!("No API token configured; running in open localhost mode");
    }

    let config = ServerConfig::new(args.token)
        .with_bind_address(args.bind)
        .with_rate_limiting(!args.no_rate_limit);

    let state = AppState::new(store, evaluator, config);
    Server::from_state(state).run().await?;
    Ok(())
}
