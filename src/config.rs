//! # Configuration Schema and Loading
//!
//! This module defines the YAML configuration file and turns it into a
//! [`GroupModel`] plus the walk and apply policy.
//!
//! ```yaml
//! repository: /var/lib/nodesync
//! require_extension: false
//! ignore: [".git", "*.swp"]
//! groups:
//!   - name: frontend
//!     members: [web, cache]
//! nodes:
//!   - name: "n[1-4]"
//!     groups: [frontend]
//!     address: "10.0.0.[11]"
//! ignore_nodes: [n3]
//! ```
//!
//! ## Error Handling
//!
//! Loading never stops at the first problem. Every definition error is
//! logged and collected, and if any occurred the whole load fails with
//! [`Error::ConfigErrors`], so a configuration either takes effect
//! completely or not at all.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::error;
use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};
use crate::groups::{GroupModel, Node};
use crate::overlay::ResolverOptions;
use crate::path::IgnoreRules;
use crate::range::{self, Sequence};

fn default_true() -> bool {
    true
}

/// A `groups:` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupDef {
    pub name: String,
    /// Member groups; range expressions are expanded.
    #[serde(default)]
    pub members: Vec<String>,
}

/// A `nodes:` entry, possibly describing many nodes at once
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeDef {
    /// Node name or range expression.
    pub name: String,
    #[serde(default)]
    pub groups: Vec<String>,
    /// Address, may contain one `[N]` auto-numbering placeholder.
    #[serde(default)]
    pub address: Option<String>,
    /// Host name, may contain one `[N]` auto-numbering placeholder.
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub no_transport: bool,
}

/// The configuration file as written
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    /// Directory holding `overlay/` and `delete/`. Relative paths are
    /// resolved against the configuration file's directory.
    #[serde(default)]
    pub repository: Option<PathBuf>,
    /// Where template generators write their output. Relative paths are
    /// resolved like `repository`.
    #[serde(default)]
    pub tempdir: Option<PathBuf>,
    #[serde(default)]
    pub require_extension: bool,
    #[serde(default)]
    pub ignore_dotfiles: bool,
    #[serde(default)]
    pub ignore_dotdirs: bool,
    /// Rename replaced destinations to `*.saved` instead of removing them.
    #[serde(default = "default_true")]
    pub backup_copies: bool,
    /// Entry names to skip; exact names or glob patterns.
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub groups: Vec<GroupDef>,
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
    #[serde(default)]
    pub ignore_nodes: Vec<String>,
    #[serde(default)]
    pub ignore_groups: Vec<String>,
}

/// A loaded, validated configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub model: GroupModel,
    pub repository: PathBuf,
    pub tempdir: PathBuf,
    pub backup_copies: bool,
    pub resolver: ResolverOptions,
}

impl Config {
    pub fn overlay_dir(&self) -> PathBuf {
        self.repository.join("overlay")
    }

    pub fn delete_dir(&self) -> PathBuf {
        self.repository.join("delete")
    }
}

/// Parse the YAML text of a configuration file.
pub fn parse_raw(yaml: &str) -> Result<RawConfig> {
    if yaml.trim().is_empty() {
        return Ok(RawConfig::default());
    }
    serde_yaml::from_str(yaml).map_err(|e| Error::ConfigParse {
        message: e.to_string(),
        hint: Some("see the example configuration for the expected keys".to_string()),
    })
}

/// Parse and load a configuration. `base_dir` anchors relative paths.
pub fn parse(yaml: &str, base_dir: &Path) -> Result<Config> {
    load(parse_raw(yaml)?, base_dir)
}

/// Read and load a configuration file.
pub fn from_file(path: &Path) -> Result<Config> {
    let text = fs::read_to_string(path).map_err(|e| Error::fs(path, "read", e))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse(&text, base_dir)
}

/// Build the group model and policy, collecting every definition error.
pub fn load(raw: RawConfig, base_dir: &Path) -> Result<Config> {
    let mut errors = Vec::new();
    let mut model = GroupModel::new();

    // groups are defined before nodes, so members are checked against
    // every node name the document declares
    let node_names: HashSet<String> = raw
        .nodes
        .iter()
        .filter_map(|def| range::expand(&def.name).ok())
        .flatten()
        .collect();

    for group in &raw.groups {
        match expand_all(&group.members) {
            Ok(members) => {
                if let Some(node) = members.iter().find(|m| node_names.contains(*m)) {
                    errors.push(Error::CompoundGroup {
                        group: group.name.clone(),
                        message: format!("member '{}' is a node name", node),
                    });
                } else if let Err(e) = model.define_group(&group.name, &members) {
                    errors.push(e);
                }
            }
            Err(e) => errors.push(e),
        }
    }

    for def in &raw.nodes {
        if let Err(e) = define_nodes(&mut model, def, &mut errors) {
            errors.push(e);
        }
    }

    for entry in &raw.ignore_nodes {
        match range::expand_list(entry) {
            Ok(names) => {
                for name in names {
                    if let Err(e) = model.ignore_node(&name) {
                        errors.push(e);
                    }
                }
            }
            Err(e) => errors.push(e),
        }
    }

    for group in &raw.ignore_groups {
        if let Err(e) = model.ignore_group(group) {
            errors.push(e);
        }
    }

    let ignore = match IgnoreRules::new(&raw.ignore) {
        Ok(rules) => rules,
        Err(e) => {
            errors.push(e);
            IgnoreRules::default()
        }
    };

    if !errors.is_empty() {
        for e in &errors {
            error!("{}", e);
        }
        return Err(Error::ConfigErrors(errors));
    }

    let anchor = |dir: PathBuf| {
        if dir.is_absolute() {
            dir
        } else {
            base_dir.join(dir)
        }
    };
    let repository = raw
        .repository
        .map(anchor)
        .unwrap_or_else(|| base_dir.to_path_buf());
    let tempdir = raw
        .tempdir
        .map(anchor)
        .unwrap_or_else(defaults::default_tempdir);

    Ok(Config {
        model,
        repository,
        tempdir,
        backup_copies: raw.backup_copies,
        resolver: ResolverOptions {
            require_extension: raw.require_extension,
            ignore_dotfiles: raw.ignore_dotfiles,
            ignore_dotdirs: raw.ignore_dotdirs,
            ignore,
        },
    })
}

fn expand_all(items: &[String]) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for item in items {
        for name in range::expand_list(item)? {
            if !out.contains(&name) {
                out.push(name);
            }
        }
    }
    Ok(out)
}

/// Expand one node directive. Each directive gets its own numbering
/// sequences, advanced once per node name.
fn define_nodes(model: &mut GroupModel, def: &NodeDef, errors: &mut Vec<Error>) -> Result<()> {
    let names = range::expand(&def.name)?;
    let groups = expand_all(&def.groups)?;
    let mut address_seq = Sequence::new();
    let mut hostname_seq = Sequence::new();

    for name in names {
        let address = def
            .address
            .as_deref()
            .map(|a| address_seq.expand(a))
            .transpose()?;
        let hostname = def
            .hostname
            .as_deref()
            .map(|h| hostname_seq.expand(h))
            .transpose()?;

        let node = Node {
            groups: groups.clone(),
            address,
            hostname,
            no_transport: def.no_transport,
            ..Node::new(name)
        };
        if let Err(e) = model.add_node(node) {
            errors.push(e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
repository: repo
require_extension: true
ignore: [".git", "*.swp"]
groups:
  - name: frontend
    members: [web, "cache[1-2]"]
nodes:
  - name: "n[1-3]"
    groups: [frontend]
    address: "10.0.0.[11]"
    hostname: "n[1].example.com"
  - name: db1
    groups: [db]
    no_transport: true
ignore_nodes: [n3]
"#;

    #[test]
    fn test_parse_sample() {
        let config = parse(SAMPLE, Path::new("/etc/nodesync")).unwrap();
        assert_eq!(config.repository, PathBuf::from("/etc/nodesync/repo"));
        assert_eq!(config.overlay_dir(), PathBuf::from("/etc/nodesync/repo/overlay"));
        assert!(config.backup_copies);
        assert!(config.resolver.require_extension);
        assert!(config.resolver.ignore.matches("x.swp"));

        let model = &config.model;
        assert_eq!(model.nodes().len(), 4);
        assert_eq!(
            model.importance_list("n2").unwrap(),
            vec!["n2", "web", "cache1", "cache2", "all"]
        );
        assert!(model.node("db1").unwrap().no_transport);
        assert!(model.is_ignored("n3"));
    }

    #[test]
    fn test_auto_numbering_per_directive() {
        let config = parse(SAMPLE, Path::new("/")).unwrap();
        let model = &config.model;
        assert_eq!(model.node("n1").unwrap().address.as_deref(), Some("10.0.0.11"));
        assert_eq!(model.node("n3").unwrap().address.as_deref(), Some("10.0.0.13"));
        assert_eq!(
            model.node("n2").unwrap().hostname.as_deref(),
            Some("n2.example.com")
        );
        assert!(model.node("db1").unwrap().address.is_none());
    }

    #[test]
    fn test_empty_config() {
        let config = parse("", Path::new("/srv")).unwrap();
        assert!(config.model.nodes().is_empty());
        assert_eq!(config.repository, PathBuf::from("/srv"));
    }

    #[test]
    fn test_unknown_key_is_parse_error() {
        let result = parse("nodez: []", Path::new("/"));
        assert!(matches!(result, Err(Error::ConfigParse { .. })));
    }

    #[test]
    fn test_errors_are_aggregated() {
        let yaml = r#"
groups:
  - name: all
    members: [x]
nodes:
  - name: n1
    groups: [none]
  - name: n2
    groups: [web]
  - name: n2
    groups: [web]
  - name: "n[5-3]"
ignore_nodes: [n9]
ignore_groups: [nosuch]
"#;
        match parse(yaml, Path::new("/")) {
            Err(Error::ConfigErrors(errors)) => {
                assert_eq!(errors.len(), 6);
                assert!(matches!(errors[0], Error::ReservedGroup { .. }));
                assert!(matches!(errors[1], Error::ReservedGroup { .. }));
                assert!(matches!(errors[2], Error::Redefinition { .. }));
                assert!(matches!(errors[3], Error::RangeSyntax { .. }));
                assert!(matches!(errors[4], Error::UnknownNode { .. }));
                assert!(matches!(errors[5], Error::UnknownGroup { .. }));
            }
            other => panic!("expected aggregated errors, got {:?}", other),
        }
    }

    #[test]
    fn test_node_as_group_member_is_compound_error() {
        let yaml = r#"
groups:
  - name: g
    members: [web, "n[1-2]"]
nodes:
  - name: n1
    groups: [web]
"#;
        match parse(yaml, Path::new("/")) {
            Err(Error::ConfigErrors(errors)) => {
                assert_eq!(errors.len(), 1, "{:?}", errors);
                match &errors[0] {
                    Error::CompoundGroup { group, message } => {
                        assert_eq!(group, "g");
                        assert!(message.contains("'n1'"));
                    }
                    other => panic!("expected a compound group error, got {:?}", other),
                }
            }
            other => panic!("expected aggregated errors, got {:?}", other),
        }
    }

    #[test]
    fn test_address_overflow_is_error() {
        let yaml = r#"
nodes:
  - name: "n[1-3]"
    address: "10.0.0.[254]"
"#;
        match parse(yaml, Path::new("/")) {
            Err(Error::ConfigErrors(errors)) => {
                assert!(matches!(errors[0], Error::RangeSyntax { .. }))
            }
            other => panic!("expected range error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_file_relative_repository() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nodesync.yaml");
        fs::write(&path, "nodes:\n  - name: n1\n    groups: [web]\n").unwrap();
        let config = from_file(&path).unwrap();
        assert_eq!(config.repository, temp.path());
        assert!(config.model.is_node("n1"));
    }

    #[test]
    fn test_from_file_missing() {
        let result = from_file(Path::new("/nonexistent/nodesync.yaml"));
        assert!(matches!(result, Err(Error::Filesystem { .. })));
    }
}
