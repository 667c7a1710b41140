//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use nodesync::output::OutputConfig;

use crate::commands;

/// nodesync - Distribute configuration files to a cluster of nodes
#[derive(Parser, Debug)]
#[command(name = "nodesync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG overrides it
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show or fix the differences between this node and the repository
    Apply(commands::apply::ApplyArgs),

    /// Show which repository file provides each destination
    Reference(commands::reference::ReferenceArgs),

    /// List the configured nodes
    Nodes(commands::nodes::NodesArgs),

    /// Show configuration details, or the details of one node
    Info(commands::info::InfoArgs),

    /// Resolve the repository for every selected node and report problems
    Check(commands::check::CheckArgs),

    /// Expand or compress node range expressions
    Range(commands::range::RangeArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);
        let output = OutputConfig::from_env_and_flag(&self.color);
        console::set_colors_enabled(output.use_color);

        match self.command {
            Commands::Apply(args) => commands::apply::execute(args, &output),
            Commands::Reference(args) => commands::reference::execute(args),
            Commands::Nodes(args) => commands::nodes::execute(args, &output),
            Commands::Info(args) => commands::info::execute(args, &output),
            Commands::Check(args) => commands::check::execute(args, &output),
            Commands::Range(args) => commands::range::execute(args),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // a logger may already be installed when running under a test harness
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}
