//! # Multi-Node Resolution
//!
//! Resolves the overlay and delete trees for many nodes at once. Every
//! node is resolved on the rayon thread pool independently of the others,
//! so one node failing (for example on an unknown group extension under
//! `require_extension`) is reported for that node alone.

use std::path::Path;

use log::debug;
use rayon::prelude::*;

use crate::config::Config;
use crate::error::Result;
use crate::overlay::{Collector, Resolved, Resolver};

/// What one node would receive.
#[derive(Debug, Clone)]
pub struct NodeReport {
    pub node: String,
    pub importance: Vec<String>,
    pub overlay: Vec<Resolved>,
    pub delete: Vec<Resolved>,
}

impl NodeReport {
    /// Number of file destinations, leaving out directories.
    pub fn file_count(&self) -> usize {
        self.overlay.iter().filter(|r| !r.entry.is_dir).count()
    }
}

/// Resolve one node's overlay and delete trees.
pub fn resolve_node(config: &Config, node: &str) -> Result<NodeReport> {
    let resolver = Resolver::new(&config.model, node, &config.resolver)?;
    let overlay = collect(&resolver, &config.overlay_dir())?;
    let delete = collect(&resolver, &config.delete_dir())?;
    Ok(NodeReport {
        node: node.to_string(),
        importance: resolver.importance_list().to_vec(),
        overlay,
        delete,
    })
}

/// Resolve every node in parallel. Results keep the order of `nodes`.
pub fn resolve_nodes(config: &Config, nodes: &[String]) -> Vec<(String, Result<NodeReport>)> {
    nodes
        .par_iter()
        .map(|node| (node.clone(), resolve_node(config, node)))
        .collect()
}

fn collect(resolver: &Resolver<'_>, root: &Path) -> Result<Vec<Resolved>> {
    if !root.is_dir() {
        debug!("{} does not exist, nothing to resolve", root.display());
        return Ok(Vec::new());
    }
    let mut collector = Collector::new();
    resolver.visit(root, &mut collector)?;
    Ok(collector.resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::error::Error;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, rel).unwrap();
    }

    const CONFIG: &str = r#"
require_extension: true
nodes:
  - name: "web[1-3]"
    groups: [web]
  - name: db1
    groups: [db]
"#;

    #[test]
    fn test_resolve_nodes_in_order() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "overlay/all/etc/motd._all");
        touch(temp.path(), "overlay/web/etc/nginx.conf._web");
        touch(temp.path(), "delete/all/etc/old._db");
        let config = config::parse(CONFIG, temp.path()).unwrap();

        let nodes: Vec<String> = ["web1", "web2", "web3", "db1"].map(String::from).to_vec();
        let results = resolve_nodes(&config, &nodes);
        let names: Vec<&str> = results.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["web1", "web2", "web3", "db1"]);

        let web1 = results[0].1.as_ref().unwrap();
        assert_eq!(web1.file_count(), 2);
        assert!(web1.delete.iter().all(|r| r.entry.is_dir));
        let db1 = results[3].1.as_ref().unwrap();
        assert_eq!(db1.file_count(), 1);
        assert_eq!(db1.delete.len(), 2);
        assert_eq!(db1.importance, vec!["db1", "db", "all"]);
    }

    #[test]
    fn test_one_failing_node_does_not_affect_others() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "overlay/all/etc/motd._all");
        // only web nodes descend into this directory and hit the bad name
        touch(temp.path(), "overlay/web/etc/app.conf._nosuch");
        let config = config::parse(CONFIG, temp.path()).unwrap();

        let nodes: Vec<String> = ["web1", "db1"].map(String::from).to_vec();
        let results = resolve_nodes(&config, &nodes);
        assert!(matches!(results[0].1, Err(Error::UnknownExtension { .. })));
        assert!(results[1].1.is_ok());
    }

    #[test]
    fn test_unknown_node() {
        let temp = TempDir::new().unwrap();
        let config = config::parse(CONFIG, temp.path()).unwrap();
        assert!(matches!(
            resolve_node(&config, "nope"),
            Err(Error::UnknownNode { .. })
        ));
    }
}
