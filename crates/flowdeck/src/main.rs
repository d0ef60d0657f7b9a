//! Flowdeck - workflow composer backend.
//!
//! Main entry point for the Flowdeck CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{check, policy, serve};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Flowdeck - workflow composer backend
#[derive(Parser)]
#[command(name = "flowdeck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the Flowdeck API server
    Serve(serve::ServeArgs),

    /// Validate a workflow document file
    Check(check::CheckArgs),

    /// Evaluate a policy script against fixture files
    Policy(policy::PolicyArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing — console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "flowdeck=debug,flowdeck_server=debug,flowdeck_policy=debug,flowdeck_store=debug,info"
    } else {
        "flowdeck=info,flowdeck_server=info,flowdeck_policy=info,flowdeck_store=info,warn"
    };

    let log_dir = dirs::config_dir()
        .map(|d| d.join("flowdeck/logs"))
        .unwrap_or_else(|| std::path::PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "flowdeck.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "flowdeck=trace,flowdeck_server=trace,flowdeck_policy=trace,flowdeck_store=trace,info",
                )),
        )
        .init();

    match cli.command {
        Commands::Serve(args) => serve::run(args).await,
        Commands::Check(args) => check::run(args).await,
        Commands::Policy(args) => policy::run(args).await,
    }
}
