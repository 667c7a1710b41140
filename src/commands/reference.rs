//! # Reference Command Implementation
//!
//! Prints, for each given destination path, the repository entry that
//! provides it on a node. Nothing on the node is looked at or changed.

use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};

use nodesync::overlay::{Collector, Resolver};

use super::{local_node, ConfigArgs};

/// Show which repository file provides each destination
#[derive(Args, Debug)]
pub struct ReferenceArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Resolve for this node instead of the one matching the host name
    #[arg(short, long, value_name = "NAME")]
    pub node: Option<String>,

    /// Destination paths to look up
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<PathBuf>,
}

/// Execute the `reference` command.
pub fn execute(args: ReferenceArgs) -> Result<()> {
    let config = args.config.load()?;
    let node = local_node(&config, args.node.as_deref())?;

    let resolver = Resolver::new(&config.model, &node, &config.resolver)?;
    let mut collector = Collector::new();
    let overlay = config.overlay_dir();
    if overlay.is_dir() {
        resolver.visit(&overlay, &mut collector)?;
    }

    let mut missing = 0;
    for path in &args.paths {
        let dest: PathBuf = path.components().collect();
        match collector.find(&dest) {
            Some(resolved) => {
                println!("{} {}", dest.display(), display_source(&resolved.entry.src, &overlay));
                if let Some(post) = &resolved.post {
                    println!("  post: {}", display_source(post, &overlay));
                }
            }
            None => {
                println!("{} (not in repository)", dest.display());
                missing += 1;
            }
        }
    }

    if missing > 0 {
        anyhow::bail!("{} path(s) not provided for node {}", missing, node);
    }
    Ok(())
}

/// Source paths relative to the overlay directory, for readability.
fn display_source(src: &Path, overlay: &Path) -> String {
    src.strip_prefix(overlay)
        .map(|rel| format!("overlay/{}", rel.display()))
        .unwrap_or_else(|_| src.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_source() {
        assert_eq!(
            display_source(Path::new("/repo/overlay/all/etc/motd"), Path::new("/repo/overlay")),
            "overlay/all/etc/motd"
        );
        assert_eq!(display_source(Path::new("/tmp/x"), Path::new("/repo/overlay")), "/tmp/x");
    }
}
