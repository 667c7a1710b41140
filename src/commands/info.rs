//! # Info Command Implementation
//!
//! Without `--node`, summarizes the loaded configuration: where the
//! repository lives, how many nodes and groups it defines and which are
//! ignored. With `--node`, shows that node's importance list and
//! attributes.

use anyhow::Result;
use clap::Args;

use nodesync::config::Config;
use nodesync::output::{emoji, OutputConfig};

use super::ConfigArgs;

/// Show configuration details, or the details of one node
#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Show the details of this node
    #[arg(short, long, value_name = "NAME")]
    pub node: Option<String>,
}

/// Execute the `info` command.
pub fn execute(args: InfoArgs, output: &OutputConfig) -> Result<()> {
    let config = args.config.load()?;
    match args.node {
        Some(name) => node_info(&config, &name, output),
        None => config_info(&config, output),
    }
}

fn config_info(config: &Config, output: &OutputConfig) -> Result<()> {
    let model = &config.model;
    let ignored: Vec<&str> = model
        .nodes()
        .iter()
        .filter(|n| model.is_ignored(&n.name))
        .map(|n| n.name.as_str())
        .collect();

    println!("{} Configuration", emoji(output, "📋", "[INFO]"));
    println!("  repository: {}", config.repository.display());
    println!("  overlay:    {}", config.overlay_dir().display());
    println!("  delete:     {}", config.delete_dir().display());
    println!("  tempdir:    {}", config.tempdir.display());
    println!("  backups:    {}", if config.backup_copies { "yes" } else { "no" });
    println!(
        "  require_extension: {}",
        if config.resolver.require_extension { "yes" } else { "no" }
    );
    println!("  nodes:      {}", model.nodes().len());
    println!("  groups:     {}", model.group_names().len());
    if !ignored.is_empty() {
        println!("  ignored:    {}", nodesync::range::compress(&ignored));
    }
    Ok(())
}

fn node_info(config: &Config, name: &str, output: &OutputConfig) -> Result<()> {
    let model = &config.model;
    let node = model
        .node(name)
        .ok_or_else(|| anyhow::anyhow!("Unknown node '{}'", name))?;

    println!("{} Node {}", emoji(output, "🖥️", "[NODE]"), node.name);
    println!("  groups:   {}", model.importance_list(name)?.join(" "));
    if let Some(address) = &node.address {
        println!("  address:  {}", address);
    }
    if let Some(hostname) = &node.hostname {
        println!("  hostname: {}", hostname);
    }
    if node.no_transport {
        println!("  no transport");
    }
    if model.is_ignored(name) {
        println!("  ignored");
    }
    Ok(())
}
