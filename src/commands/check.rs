//! # Check Command Implementation
//!
//! Resolves the repository for every selected node in parallel and
//! reports, per node, how many destinations it would receive and remove.
//! Resolution errors are reported per node, and any of them makes the
//! command fail once all nodes have been checked.
//!
//! This is a read-only operation; no node filesystem is touched.

use anyhow::Result;
use clap::Args;

use nodesync::fanout;
use nodesync::output::{emoji, OutputConfig};

use super::{ConfigArgs, SelectArgs};

/// Resolve the repository for every selected node and report problems
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub select: SelectArgs,

    /// Only print nodes that fail
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute the `check` command.
pub fn execute(args: CheckArgs, output: &OutputConfig) -> Result<()> {
    let config = args.config.load()?;
    let nodes = args.select.resolve(&config)?;

    let mut failed = 0;
    for (node, result) in fanout::resolve_nodes(&config, &nodes) {
        match result {
            Ok(report) => {
                if !args.quiet {
                    let deletions = report.delete.iter().filter(|r| !r.entry.is_dir).count();
                    println!(
                        "{} {}: {} file(s), {} deletion(s)",
                        emoji(output, "✅", "[OK]"),
                        node,
                        report.file_count(),
                        deletions
                    );
                }
            }
            Err(e) => {
                failed += 1;
                println!("{} {}: {}", emoji(output, "❌", "[FAIL]"), node, e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} node(s) failed", failed, nodes.len());
    }
    Ok(())
}
