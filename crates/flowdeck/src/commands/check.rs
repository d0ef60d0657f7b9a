//! Check command - validates a workflow document file.

use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use clap::Args;

use flowdeck_types::{NodeConfig, WorkflowDocument};

/// Arguments for the check command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to a workflow document (JSON)
    pub file: PathBuf,
}

pub async fn run(args: CheckArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;

    let document = WorkflowDocument::from_json(&raw)
        .with_context(|| format!("parsing {}", args.file.display()))?;

    if let Err(e) = document.validate() {
        bail!("{}: {e}", args.file.display());
    }

    let policy_nodes = document
        .nodes
        .iter()
        .filter(|n| matches!(n.config, NodeConfig::SodPolicy { .. }))
        .count();

    println!(
        "{}: ok ({} nodes, {} edges, {} policy node{})",
        args.file.display(),
        document.nodes.len(),
        document.edges.len(),
        policy_nodes,
        if policy_nodes == 1 { "" } else { "s" }
    );
    Ok(())
}
