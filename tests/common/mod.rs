//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new()
//!         .with_config(configs::CLUSTER)
//!         .with_overlay("all/etc/motd", "hello\n");
//!     fixture.command().args(["apply", "--node", "web1"]).assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    pub use super::TestFixture;
}

/// Configuration snippets for testing.
#[allow(dead_code)]
pub mod configs {
    /// Four web nodes, one database node, one ignored node.
    pub const CLUSTER: &str = r#"
tempdir: tmp
groups:
  - name: cluster
    members: [web, db]
nodes:
  - name: "web[1-4]"
    groups: [web]
    address: "10.0.0.[11]"
  - name: db1
    groups: [db]
    hostname: db1.example.com
  - name: spare1
    groups: [web]
ignore_nodes: [spare1]
"#;

    /// Configuration with definition errors in several places.
    pub const BROKEN: &str = r#"
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
"#;

    pub const INVALID_YAML: &str = "nodes: [[[";
}

/// A temporary directory holding a configuration file, a repository next
/// to it, and a fake node root the applier writes into.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child("root")
            .create_dir_all()
            .expect("Failed to create node root");
        Self { temp_dir }
    }

    /// Write `nodesync.yaml` with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child("nodesync.yaml")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Add a file below `overlay/`.
    pub fn with_overlay(self, path: &str, content: &str) -> Self {
        self.with_file(&format!("overlay/{}", path), content)
    }

    /// Add a file below `delete/`.
    #[allow(dead_code)]
    pub fn with_delete(self, path: &str) -> Self {
        self.with_file(&format!("delete/{}", path), "")
    }

    /// Add an executable shell script below `overlay/`.
    #[allow(dead_code)]
    pub fn with_script(self, path: &str, body: &str) -> Self {
        let rel = format!("overlay/{}", path);
        let fixture = self.with_file(&rel, &format!("#!/bin/sh\n{}\n", body));
        let file = fixture.path().join(&rel);
        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to make script executable");
        fixture
    }

    /// Add a file below the node root, as if it were already installed.
    #[allow(dead_code)]
    pub fn with_installed(self, path: &str, content: &str) -> Self {
        self.with_file(&format!("root/{}", path), content)
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("nodesync.yaml")
    }

    /// The fake node root.
    pub fn root(&self) -> PathBuf {
        self.temp_dir.path().join("root")
    }

    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixture {
    /// A command for the binary, configured through `NODESYNC_CONFIG` and
    /// with color and host name detection pinned down.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("nodesync");
        cmd.current_dir(self.path())
            .env("NODESYNC_CONFIG", self.config_path())
            .env("NO_COLOR", "1")
            .env("HOSTNAME", "nonexistent-host")
            .env_remove("RUST_LOG");
        cmd
    }

    /// `apply` for one node against the fake root.
    #[allow(dead_code)]
    pub fn apply(&self, node: &str) -> assert_cmd::Command {
        let mut cmd = self.command();
        cmd.arg("apply")
            .arg("--node")
            .arg(node)
            .arg("--root")
            .arg(self.root());
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_root() {
        let fixture = TestFixture::new();
        assert!(fixture.root().is_dir());
    }

    #[test]
    fn test_fixture_with_config() {
        let fixture = TestFixture::new().with_config(configs::CLUSTER);
        assert!(fixture.config_path().exists());
    }

    #[test]
    fn test_fixture_with_overlay() {
        let fixture = TestFixture::new().with_overlay("all/etc/motd", "hi");
        assert!(fixture.path().join("overlay/all/etc/motd").exists());
    }
}
