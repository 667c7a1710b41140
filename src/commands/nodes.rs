//! # Nodes Command Implementation
//!
//! Lists the nodes chosen by the selection options, one per line, or as a
//! single compressed range expression.

use anyhow::Result;
use clap::Args;

use nodesync::output::OutputConfig;
use nodesync::range;

use super::{ConfigArgs, SelectArgs};

/// List the configured nodes
#[derive(Args, Debug)]
pub struct NodesArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub select: SelectArgs,

    /// Also show groups, address and host name
    #[arg(short, long)]
    pub long: bool,

    /// Print the selection as one range expression
    #[arg(long, conflicts_with = "long")]
    pub compress: bool,
}

/// Execute the `nodes` command.
pub fn execute(args: NodesArgs, output: &OutputConfig) -> Result<()> {
    let config = args.config.load()?;
    let nodes = args.select.resolve(&config)?;

    if args.compress {
        println!("{}", range::compress(&nodes));
        return Ok(());
    }

    for name in &nodes {
        if !args.long {
            println!("{}", name);
            continue;
        }
        let node = match config.model.node(name) {
            Some(node) => node,
            None => continue,
        };
        let groups = config.model.importance_list(name)?;
        let mut line = format!("{} groups={}", name, groups[1..].join(","));
        if let Some(address) = &node.address {
            line.push_str(&format!(" address={}", address));
        }
        if let Some(hostname) = &node.hostname {
            line.push_str(&format!(" hostname={}", hostname));
        }
        if node.no_transport {
            line.push_str(" no_transport");
        }
        if output.use_color {
            println!("{}", console::style(line).bold());
        } else {
            println!("{}", line);
        }
    }
    Ok(())
}
