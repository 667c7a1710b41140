//! Apply command implementation
//!
//! Reconciles this node with the repository:
//! 1. Resolve the overlay tree for the node and fix every destination
//! 2. Resolve the delete tree and remove every destination it names
//! 3. Run the deferred directory post scripts
//!
//! Without `--fix` nothing is changed and the report says what would be
//! done.

use anyhow::Result;
use clap::Args;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use nodesync::apply::{Applier, ApplyOptions, ApplyReport, Mode};
use nodesync::config::Config;
use nodesync::output::{change_line, emoji, hook_line, OutputConfig};
use nodesync::overlay::Resolver;

use super::{local_node, ConfigArgs};

/// Arguments for the apply command
#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Act as this node instead of the one matching the host name
    #[arg(short, long, value_name = "NAME")]
    pub node: Option<String>,

    /// Make the changes instead of only reporting them
    #[arg(short, long)]
    pub fix: bool,

    /// Only work on these destination paths
    #[arg(short, long, value_name = "PATH")]
    pub single: Vec<PathBuf>,

    /// Directory the destination paths live under
    #[arg(long, value_name = "DIR", default_value = "/")]
    pub root: PathBuf,

    /// Suppress the summary line
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute the apply command
pub fn execute(args: ApplyArgs, output: &OutputConfig) -> Result<()> {
    let config = args.config.load()?;
    let node = local_node(&config, args.node.as_deref())?;

    if config.model.is_ignored(&node) {
        if !args.quiet {
            println!("{} node {} is ignored", emoji(output, "⏭️", "[SKIP]"), node);
        }
        return Ok(());
    }

    let only = single_destinations(&args.single)?;
    let options = ApplyOptions {
        node: node.clone(),
        root: args.root.clone(),
        dry_run: !args.fix,
        backup_copies: config.backup_copies,
        tempdir: config.tempdir.clone(),
        only,
    };

    let report = run(&config, &node, &options)?;

    for change in &report.changes {
        println!("{}", change_line(output, change, options.dry_run));
    }
    for hook in &report.hooks {
        println!("{}", hook_line(output, hook));
    }

    if !report.errors.is_empty() {
        anyhow::bail!("{} error(s) while applying to {}", report.errors.len(), node);
    }

    if !args.quiet {
        if report.changes.is_empty() {
            println!("{} {} is up to date", emoji(output, "✅", "[OK]"), node);
        } else if options.dry_run {
            println!(
                "{} {} change(s) pending, run with --fix to apply",
                emoji(output, "🔎", "[DRY RUN]"),
                report.changes.len()
            );
        } else {
            println!(
                "{} {} change(s) applied",
                emoji(output, "✅", "[OK]"),
                report.changes.len()
            );
        }
    }
    Ok(())
}

/// Apply the overlay tree and then the delete tree for `node`.
pub fn run(config: &Config, node: &str, options: &ApplyOptions) -> Result<ApplyReport> {
    let resolver = Resolver::new(&config.model, node, &config.resolver)?;
    let mut report = ApplyReport::default();

    for (root, mode) in [
        (config.overlay_dir(), Mode::Overlay),
        (config.delete_dir(), Mode::Delete),
    ] {
        if !root.is_dir() {
            log::debug!("{} does not exist, skipping", root.display());
            continue;
        }
        let mut applier = Applier::new(options.clone(), mode);
        resolver.visit(&root, &mut applier)?;
        report.merge(applier.finish());
    }
    Ok(report)
}

fn single_destinations(paths: &[PathBuf]) -> Result<Option<HashSet<PathBuf>>> {
    if paths.is_empty() {
        return Ok(None);
    }
    let mut set = HashSet::new();
    for path in paths {
        if !path.is_absolute() {
            anyhow::bail!("Destination must be an absolute path: {}", path.display());
        }
        set.insert(normalize(path));
    }
    Ok(Some(set))
}

/// Drop trailing slashes and `.` components so `/etc/` matches `/etc`.
fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}
