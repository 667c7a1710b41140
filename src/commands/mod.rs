//! # CLI Command Implementations
//!
//! One file per subcommand of the `nodesync` tool. Each command module
//! contains:
//! - An `Args` struct with the command's options, derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and calls into the
//!   `nodesync` library.
//!
//! Options shared by several commands live here: [`ConfigArgs`] locates
//! and loads the configuration file, [`SelectArgs`] picks nodes.

pub mod apply;
pub mod check;
pub mod completions;
pub mod info;
pub mod nodes;
pub mod range;
pub mod reference;

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use nodesync::config::{self, Config};
use nodesync::defaults;
use nodesync::select::{self, Selection};

/// Location of the configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to the configuration file.
    ///
    /// Defaults to `~/.config/nodesync/nodesync.yaml`.
    #[arg(short, long, value_name = "FILE", env = "NODESYNC_CONFIG")]
    pub config: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(defaults::default_config_path)
    }

    pub fn load(&self) -> Result<Config> {
        let path = self.path();
        if !path.exists() {
            anyhow::bail!("Configuration file not found: {}", path.display());
        }
        config::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))
    }
}

/// Node selection options. Each value is a comma separated list that may
/// contain range expressions such as `n[1-4]`.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectArgs {
    /// Nodes to include
    #[arg(short, long, value_name = "NODES")]
    pub node: Vec<String>,

    /// Groups whose nodes to include
    #[arg(short, long, value_name = "GROUPS")]
    pub group: Vec<String>,

    /// Nodes to leave out
    #[arg(short = 'x', long, value_name = "NODES")]
    pub exclude: Vec<String>,

    /// Groups whose nodes to leave out
    #[arg(short = 'X', long, value_name = "GROUPS")]
    pub exclude_group: Vec<String>,
}

impl SelectArgs {
    pub fn selection(&self) -> Selection {
        Selection {
            nodes: self.node.clone(),
            groups: self.group.clone(),
            exclude_nodes: self.exclude.clone(),
            exclude_groups: self.exclude_group.clone(),
        }
    }

    pub fn resolve(&self, config: &Config) -> Result<Vec<String>> {
        Ok(self.selection().resolve(&config.model)?)
    }
}

/// The node to act as: the one given on the command line, or the
/// configured node matching this machine's host name.
pub fn local_node(config: &Config, explicit: Option<&str>) -> Result<String> {
    match explicit {
        Some(name) => {
            if !config.model.is_node(name) {
                anyhow::bail!("Unknown node '{}'", name);
            }
            Ok(name.to_string())
        }
        None => select::detect_local_node(&config.model).ok_or_else(|| {
            anyhow::anyhow!("Could not determine which node this is; use --node NAME")
        }),
    }
}
