//! # nodesync CLI
//!
//! This is the binary entry point for the `nodesync` command-line tool.
//!
//! It parses the command line with `clap`, runs the selected command and
//! turns any error into a message on stderr and a non-zero exit status.
//! All of the actual work lives in the `nodesync` library crate.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
