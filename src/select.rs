//! Node selection from command-line filters, and detection of the node
//! the program is running on.

use std::fs;

use log::debug;

use crate::error::{Error, Result};
use crate::groups::GroupModel;
use crate::range;

/// Which nodes a command works on. Every list may hold range expressions.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub nodes: Vec<String>,
    pub groups: Vec<String>,
    pub exclude_nodes: Vec<String>,
    pub exclude_groups: Vec<String>,
}

impl Selection {
    /// The selected node names in definition order.
    ///
    /// Without `nodes` and `groups` every node is selected. Ignored nodes
    /// are never selected.
    pub fn resolve(&self, model: &GroupModel) -> Result<Vec<String>> {
        let nodes = expand_names(&self.nodes)?;
        let groups = expand_names(&self.groups)?;
        let exclude_nodes = expand_names(&self.exclude_nodes)?;
        let exclude_groups = expand_names(&self.exclude_groups)?;

        for name in nodes.iter().chain(&exclude_nodes) {
            if !model.is_node(name) {
                return Err(Error::UnknownNode { name: name.clone() });
            }
        }
        for name in groups.iter().chain(&exclude_groups) {
            if !model.is_known_group(name) {
                return Err(Error::UnknownGroup { name: name.clone() });
            }
        }

        let everything = nodes.is_empty() && groups.is_empty();
        let in_groups = model.all_nodes_in(&groups);
        let excluded = model.all_nodes_in(&exclude_groups);

        let selected = model
            .nodes()
            .iter()
            .map(|node| node.name.as_str())
            .filter(|name| everything || nodes.iter().any(|n| n == name) || in_groups.iter().any(|n| n == name))
            .filter(|name| !exclude_nodes.iter().any(|n| n == name) && !excluded.iter().any(|n| n == name))
            .filter(|name| {
                let ignored = model.is_ignored(name);
                if ignored {
                    debug!("skipping ignored node {}", name);
                }
                !ignored
            })
            .map(str::to_string)
            .collect();
        Ok(selected)
    }
}

fn expand_names(items: &[String]) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for item in items {
        out.extend(range::expand_list(item)?);
    }
    Ok(out)
}

/// The host name of this machine, from `HOSTNAME` or `/etc/hostname`.
pub fn local_hostname() -> Option<String> {
    if let Ok(name) = std::env::var("HOSTNAME") {
        let name = name.trim().to_string();
        if !name.is_empty() {
            return Some(name);
        }
    }
    let name = fs::read_to_string("/etc/hostname").ok()?.trim().to_string();
    (!name.is_empty()).then_some(name)
}

/// Find the configured node for `hostname`.
///
/// A node matches when its name or configured host name equals the full
/// host name or its first label.
pub fn find_node(model: &GroupModel, hostname: &str) -> Option<String> {
    let short = hostname.split('.').next().unwrap_or(hostname);
    model
        .nodes()
        .iter()
        .find(|node| {
            node.name == hostname
                || node.name == short
                || node.hostname.as_deref().is_some_and(|h| h == hostname || h == short)
        })
        .map(|node| node.name.clone())
}

/// The configured node this program is running on, if any.
pub fn detect_local_node(model: &GroupModel) -> Option<String> {
    let hostname = local_hostname()?;
    debug!("local host name is {}", hostname);
    find_node(model, &hostname)
}
