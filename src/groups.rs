//! # Groups and Nodes
//!
//! The group model decides which parts of the repository apply to a node.
//! Every node carries an *importance list*: its own name first, then its
//! groups with compound groups flattened, and the implicit group `all`
//! last. Index 0 is the most specific entry and wins ties.
//!
//! ```
//! use nodesync::groups::GroupModel;
//!
//! let mut model = GroupModel::new();
//! model.define_group("frontend", &["web", "cache"]).unwrap();
//! model.define_node("n1", &["frontend", "web"]).unwrap();
//!
//! assert_eq!(
//!     model.importance_list("n1").unwrap(),
//!     vec!["n1", "web", "cache", "all"]
//! );
//! ```

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};

/// Matches every node, lowest precedence.
pub const GROUP_ALL: &str = "all";
/// Matches no node.
pub const GROUP_NONE: &str = "none";
/// Reserved for template entries in the repository.
pub const GROUP_TEMPLATE: &str = "template";

const RESERVED: [&str; 3] = [GROUP_ALL, GROUP_NONE, GROUP_TEMPLATE];

pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// A named group. Atomic groups have no members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub members: Vec<String>,
}

impl Group {
    pub fn is_compound(&self) -> bool {
        !self.members.is_empty()
    }
}

/// A managed node and its explicit group memberships.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Node {
    pub name: String,
    /// Groups as written in the configuration, compound groups unexpanded.
    pub groups: Vec<String>,
    /// Address override used by transports instead of the node name.
    pub address: Option<String>,
    /// Host name the node answers to, used for local node detection.
    pub hostname: Option<String>,
    /// Do not push files to this node over the transport.
    pub no_transport: bool,
    /// Excluded from node selection.
    pub ignored: bool,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Group and node definitions for one configuration.
#[derive(Debug, Clone, Default)]
pub struct GroupModel {
    groups: HashMap<String, Group>,
    nodes: Vec<Node>,
    node_index: HashMap<String, usize>,
    ignored_groups: HashSet<String>,
}

impl GroupModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a compound group.
    ///
    /// A group that so far only exists as an auto-registered atomic group
    /// may be given members once; any other existing group or node name is
    /// a redefinition. Members that are not yet known become atomic groups.
    pub fn define_group<S: AsRef<str>>(&mut self, name: &str, members: &[S]) -> Result<()> {
        if is_reserved(name) {
            return Err(Error::ReservedGroup {
                name: name.to_string(),
            });
        }
        if self.node_index.contains_key(name) {
            return Err(Error::Redefinition {
                kind: "node",
                name: name.to_string(),
            });
        }
        if self.groups.get(name).is_some_and(Group::is_compound) {
            return Err(Error::Redefinition {
                kind: "group",
                name: name.to_string(),
            });
        }

        let members: Vec<String> = members.iter().map(|m| m.as_ref().to_string()).collect();
        for member in &members {
            if is_reserved(member) {
                return Err(Error::ReservedGroup {
                    name: member.clone(),
                });
            }
            if self.node_index.contains_key(member) {
                return Err(Error::CompoundGroup {
                    group: name.to_string(),
                    message: format!("member '{}' is a node name", member),
                });
            }
        }

        if members.iter().any(|m| m == name) || self.flatten(&members).iter().any(|g| g == name) {
            return Err(Error::CompoundGroup {
                group: name.to_string(),
                message: "group contains itself".to_string(),
            });
        }

        for member in &members {
            self.register_atomic(member);
        }
        self.groups.insert(
            name.to_string(),
            Group {
                name: name.to_string(),
                members,
            },
        );
        Ok(())
    }

    /// Register a node with its explicit groups.
    pub fn define_node<S: AsRef<str>>(&mut self, name: &str, groups: &[S]) -> Result<()> {
        self.add_node(Node {
            groups: groups.iter().map(|g| g.as_ref().to_string()).collect(),
            ..Node::new(name)
        })
    }

    /// Register a fully populated node.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if is_reserved(&node.name) {
            return Err(Error::ReservedGroup {
                name: node.name.clone(),
            });
        }
        if self.node_index.contains_key(&node.name) {
            return Err(Error::Redefinition {
                kind: "node",
                name: node.name.clone(),
            });
        }
        if self.groups.contains_key(&node.name) {
            return Err(Error::Redefinition {
                kind: "group",
                name: node.name.clone(),
            });
        }
        for group in &node.groups {
            if is_reserved(group) {
                return Err(Error::ReservedGroup {
                    name: group.clone(),
                });
            }
            if group != &node.name && self.node_index.contains_key(group) {
                return Err(Error::CompoundGroup {
                    group: group.clone(),
                    message: format!("node '{}' cannot be used as a group", group),
                });
            }
        }

        for group in &node.groups {
            if group != &node.name {
                self.register_atomic(group);
            }
        }
        self.node_index.insert(node.name.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    fn register_atomic(&mut self, name: &str) {
        if !self.groups.contains_key(name) {
            self.groups.insert(
                name.to_string(),
                Group {
                    name: name.to_string(),
                    members: Vec::new(),
                },
            );
        }
    }

    /// Flatten compound groups, keeping first-seen order and dropping
    /// duplicates. Unknown names are registered as atomic groups.
    pub fn expand_membership<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<String> {
        let names: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
        for name in &names {
            if !self.node_index.contains_key(name) && !is_reserved(name) {
                self.register_atomic(name);
            }
        }
        self.flatten(&names)
    }

    fn flatten(&self, names: &[String]) -> Vec<String> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = HashSet::new();
        for name in names {
            self.flatten_into(name, &mut out, &mut seen, &mut stack);
        }
        out
    }

    fn flatten_into(
        &self,
        name: &str,
        out: &mut Vec<String>,
        seen: &mut HashSet<String>,
        stack: &mut HashSet<String>,
    ) {
        match self.groups.get(name) {
            Some(group) if group.is_compound() => {
                if !stack.insert(name.to_string()) {
                    return;
                }
                for member in &group.members {
                    self.flatten_into(member, out, seen, stack);
                }
                stack.remove(name);
            }
            _ => {
                if seen.insert(name.to_string()) {
                    out.push(name.to_string());
                }
            }
        }
    }

    /// The node's groups ordered from most to least specific.
    ///
    /// Ignored groups are left out; the node's own name and `all` never are.
    pub fn importance_list(&self, node: &str) -> Result<Vec<String>> {
        let node = self.node(node).ok_or_else(|| Error::UnknownNode {
            name: node.to_string(),
        })?;

        let mut list = vec![node.name.clone()];
        for group in self.flatten(&node.groups) {
            if group == node.name || group == GROUP_ALL || self.ignored_groups.contains(&group) {
                continue;
            }
            if !list.contains(&group) {
                list.push(group);
            }
        }
        list.push(GROUP_ALL.to_string());
        Ok(list)
    }

    /// Nodes whose importance list contains any of `groups`, in definition
    /// order. Compound groups match through their members and node names
    /// match themselves.
    pub fn all_nodes_in<S: AsRef<str>>(&self, groups: &[S]) -> Vec<String> {
        let requested: Vec<String> = groups
            .iter()
            .map(|g| g.as_ref().to_string())
            .filter(|g| !self.ignored_groups.contains(g))
            .collect();
        let wanted: HashSet<String> = self
            .flatten(&requested)
            .into_iter()
            .filter(|g| !self.ignored_groups.contains(g) && g != GROUP_NONE)
            .collect();

        self.nodes
            .iter()
            .filter(|node| {
                self.importance_list(&node.name)
                    .map(|list| list.iter().any(|g| wanted.contains(g.as_str())))
                    .unwrap_or(false)
            })
            .map(|node| node.name.clone())
            .collect()
    }

    /// Mark a defined group as ignored.
    pub fn ignore_group(&mut self, name: &str) -> Result<()> {
        if !self.groups.contains_key(name) {
            return Err(Error::UnknownGroup {
                name: name.to_string(),
            });
        }
        self.ignored_groups.insert(name.to_string());
        Ok(())
    }

    /// Mark a defined node as ignored.
    pub fn ignore_node(&mut self, name: &str) -> Result<()> {
        let idx = *self.node_index.get(name).ok_or_else(|| Error::UnknownNode {
            name: name.to_string(),
        })?;
        self.nodes[idx].ignored = true;
        Ok(())
    }

    /// Whether the node is ignored directly or through one of its groups.
    pub fn is_ignored(&self, name: &str) -> bool {
        match self.node(name) {
            Some(node) => {
                node.ignored
                    || self
                        .flatten(&node.groups)
                        .iter()
                        .any(|g| self.ignored_groups.contains(g))
            }
            None => false,
        }
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.node_index.get(name).map(|&idx| &self.nodes[idx])
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn is_node(&self, name: &str) -> bool {
        self.node_index.contains_key(name)
    }

    /// Whether `name` is any group known to this configuration, including
    /// the implicit ones and node names (which act as their own group).
    pub fn is_known_group(&self, name: &str) -> bool {
        is_reserved(name) || self.groups.contains_key(name) || self.node_index.contains_key(name)
    }

    /// All explicitly known group names, sorted.
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }
}
