//! # nodesync
//!
//! Configuration distribution for a cluster of nodes. A repository holds
//! an overlay tree that mirrors the filesystem of a node; every entry is
//! scoped to the nodes that should receive it by the group extension in
//! its name. This library resolves, for one node, which repository entry
//! wins for every destination path, compares it with what is on disk, and
//! fixes the difference.
//!
//! ## Quick Example
//!
//! ```
//! use nodesync::config;
//! use nodesync::range;
//! use std::path::Path;
//!
//! let yaml = r#"
//! groups:
//!   - name: frontend
//!     members: [web, cache]
//! nodes:
//!   - name: "n[1-3]"
//!     groups: [frontend]
//!     address: "10.0.0.[11]"
//! "#;
//! let config = config::parse(yaml, Path::new("/srv/nodesync")).unwrap();
//! assert_eq!(
//!     config.model.importance_list("n2").unwrap(),
//!     vec!["n2", "web", "cache", "all"]
//! );
//! assert_eq!(
//!     config.model.node("n3").unwrap().address.as_deref(),
//!     Some("10.0.0.13")
//! );
//!
//! assert_eq!(range::expand("n[1-3]").unwrap(), vec!["n1", "n2", "n3"]);
//! assert_eq!(range::compress(&["n1", "n2", "n3", "db1"]), "n[1-3],db1");
//! ```
//!
//! ## Core Concepts
//!
//! - **Groups (`groups`)**: nodes, atomic and compound groups, and each
//!   node's importance list (own name first, `all` last).
//! - **Ranges (`range`)**: `n[1-4,7]` style name lists, their compression,
//!   and `[N]` auto-numbering of addresses.
//! - **Configuration (`config`)**: the YAML file that defines groups and
//!   nodes, loaded all-or-nothing.
//! - **Overlay resolution (`overlay`)**: the walk that picks the most
//!   important source for each destination and registers hook scripts.
//! - **Classification (`classify`, `object`)**: what a destination needs
//!   to match its source.
//! - **Applying (`apply`)**: dry-run reporting or fixing, hooks included.
//! - **Selection and fan-out (`select`, `fanout`)**: choosing nodes and
//!   resolving many of them in parallel.

pub mod apply;
pub mod classify;
pub mod config;
pub mod defaults;
pub mod error;
pub mod fanout;
pub mod groups;
pub mod object;
pub mod output;
pub mod overlay;
pub mod path;
pub mod range;
pub mod select;

#[cfg(test)]
mod range_proptest;
