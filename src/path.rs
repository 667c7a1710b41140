//! Path and file name helpers for nodesync

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use glob::Pattern;

use crate::error::{Error, Result};

/// Match a name against a glob pattern
pub fn glob_match(pattern: &str, name: &str) -> Result<bool> {
    let pattern = Pattern::new(pattern).map_err(Error::Glob)?;
    Ok(pattern.matches(name))
}

fn has_wildcard(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Repository entry names to skip while walking the overlay tree.
///
/// Entries without wildcard characters are compared exactly, the rest are
/// glob patterns matched against the single entry name.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    exact: HashSet<String>,
    patterns: Vec<Pattern>,
}

impl IgnoreRules {
    pub fn new<S: AsRef<str>>(entries: &[S]) -> Result<Self> {
        let mut rules = Self::default();
        for entry in entries {
            rules.add(entry.as_ref())?;
        }
        Ok(rules)
    }

    pub fn add(&mut self, entry: &str) -> Result<()> {
        if has_wildcard(entry) {
            self.patterns.push(Pattern::new(entry)?);
        } else {
            self.exact.insert(entry.to_string());
        }
        Ok(())
    }

    pub fn matches(&self, name: &str) -> bool {
        self.exact.contains(name) || self.patterns.iter().any(|p| p.matches(name))
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.patterns.is_empty()
    }
}

/// Place an absolute destination path below `root`.
///
/// `/etc/hosts` under `/mnt/node` becomes `/mnt/node/etc/hosts`; with the
/// default root `/` the path is returned as is.
pub fn under_root(root: &Path, dest: &Path) -> PathBuf {
    let relative: PathBuf = dest
        .components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect();
    root.join(relative)
}

/// Number of normal components, used to order work deepest first.
pub fn depth(path: &Path) -> usize {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count()
}

/// The path with `suffix` appended to its file name, e.g. `x` -> `x.saved`.
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}
