//! # Range Command Implementation
//!
//! `range expand` prints every name a list of range expressions denotes;
//! `range compress` prints the shortest range expression for a list of
//! names. Both accept comma separated lists as well as separate arguments.

use anyhow::Result;
use clap::{Args, Subcommand};

use nodesync::range;

/// Expand or compress node range expressions
#[derive(Args, Debug)]
pub struct RangeArgs {
    #[command(subcommand)]
    pub action: RangeAction,
}

#[derive(Subcommand, Debug)]
pub enum RangeAction {
    /// Print one name per line for the given expressions
    Expand {
        #[arg(required = true, value_name = "EXPR")]
        exprs: Vec<String>,
    },
    /// Print the given names as one range expression
    Compress {
        #[arg(required = true, value_name = "NAME")]
        names: Vec<String>,
    },
}

/// Execute the `range` command.
pub fn execute(args: RangeArgs) -> Result<()> {
    match args.action {
        RangeAction::Expand { exprs } => {
            for name in expand_all(&exprs)? {
                println!("{}", name);
            }
        }
        RangeAction::Compress { names } => {
            println!("{}", range::compress(&expand_all(&names)?));
        }
    }
    Ok(())
}

fn expand_all(items: &[String]) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for item in items {
        for name in range::expand_list(item)? {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    Ok(names)
}
