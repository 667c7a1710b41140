//! End-to-end tests for the `range` and `completions` commands.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_range_expand() {
    cargo_bin_cmd!("nodesync")
        .args(["range", "expand", "n[08-10]", "db1"])
        .assert()
        .success()
        .stdout("n08\nn09\nn10\ndb1\n");
}

#[test]
fn test_range_expand_step() {
    cargo_bin_cmd!("nodesync")
        .args(["range", "expand", "x[1-7/3]"])
        .assert()
        .success()
        .stdout("x1\nx4\nx7\n");
}

#[test]
fn test_range_expand_invalid() {
    cargo_bin_cmd!("nodesync")
        .args(["range", "expand", "n[5-1]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid range expression"));
}

#[test]
fn test_range_compress() {
    cargo_bin_cmd!("nodesync")
        .args(["range", "compress", "n1,n2,n3", "n5", "db1"])
        .assert()
        .success()
        .stdout("n[1-3,5],db1\n");
}

#[test]
fn test_completions_bash() {
    cargo_bin_cmd!("nodesync")
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nodesync"));
}

#[test]
fn test_version() {
    cargo_bin_cmd!("nodesync")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nodesync"));
}
