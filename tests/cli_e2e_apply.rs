//! End-to-end tests for the `nodesync apply` command.

mod common;
use common::prelude::*;
use std::fs;

#[test]
fn test_apply_help() {
    TestFixture::new()
        .command()
        .args(["apply", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--fix"))
        .stdout(predicate::str::contains("--single"));
}

#[test]
fn test_apply_missing_config() {
    let fixture = TestFixture::new();
    fixture
        .apply("web1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_apply_invalid_yaml() {
    let fixture = TestFixture::new().with_config(configs::INVALID_YAML);
    fixture
        .apply("web1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_apply_reports_all_definition_errors() {
    let fixture = TestFixture::new().with_config(configs::BROKEN);
    fixture
        .apply("n2")
        .assert()
        .failure()
        .stderr(predicate::str::contains("3 error(s) in configuration"))
        .stderr(predicate::str::contains("Redefinition of node 'n2'"));
}

#[test]
fn test_apply_dry_run_changes_nothing() {
    let fixture = TestFixture::new()
        .with_config(configs::CLUSTER)
        .with_overlay("all/etc/motd", "hello\n");

    fixture
        .apply("web1")
        .assert()
        .success()
        .stdout(predicate::str::contains("would create /etc/motd"))
        .stdout(predicate::str::contains("run with --fix"));
    assert!(!fixture.root().join("etc/motd").exists());
}

#[test]
fn test_apply_fix_then_up_to_date() {
    let fixture = TestFixture::new()
        .with_config(configs::CLUSTER)
        .with_overlay("all/etc/motd", "hello\n");

    fixture
        .apply("web1")
        .arg("--fix")
        .assert()
        .success()
        .stdout(predicate::str::contains("create /etc/motd"));
    assert_eq!(
        fs::read_to_string(fixture.root().join("etc/motd")).unwrap(),
        "hello\n"
    );

    fixture
        .apply("web1")
        .arg("--fix")
        .assert()
        .success()
        .stdout(predicate::str::contains("web1 is up to date"));
}

#[test]
fn test_apply_picks_group_specific_file() {
    let fixture = TestFixture::new()
        .with_config(configs::CLUSTER)
        .with_overlay("all/etc/role", "generic\n")
        .with_overlay("all/etc/role._db", "database\n")
        .with_overlay("all/etc/role._web", "webserver\n");

    fixture.apply("db1").arg("--fix").assert().success();
    assert_eq!(
        fs::read_to_string(fixture.root().join("etc/role")).unwrap(),
        "database\n"
    );
}

#[test]
fn test_apply_updates_content_and_runs_post_script() {
    let fixture = TestFixture::new()
        .with_config(configs::CLUSTER)
        .with_overlay("all/etc/motd", "new\n")
        .with_script("all/etc/motd.post", "echo ran > hook.out")
        .with_installed("etc/motd", "old\n");

    fixture
        .apply("web2")
        .arg("--fix")
        .assert()
        .success()
        .stdout(predicate::str::contains("update /etc/motd (content mismatch)"))
        .stdout(predicate::str::contains("ran "));

    let etc = fixture.root().join("etc");
    assert_eq!(fs::read_to_string(etc.join("motd")).unwrap(), "new\n");
    assert_eq!(fs::read_to_string(etc.join("motd.saved")).unwrap(), "old\n");
    assert!(etc.join("hook.out").exists());
}

#[test]
fn test_apply_single_destination() {
    let fixture = TestFixture::new()
        .with_config(configs::CLUSTER)
        .with_overlay("all/etc/a", "a\n")
        .with_overlay("all/etc/b", "b\n");

    fixture
        .apply("web1")
        .args(["--fix", "--single", "/etc/b"])
        .assert()
        .success();
    assert!(!fixture.root().join("etc/a").exists());
    assert!(fixture.root().join("etc/b").exists());
}

#[test]
fn test_apply_delete_tree() {
    let fixture = TestFixture::new()
        .with_config(configs::CLUSTER)
        .with_delete("all/etc/old.conf._web")
        .with_installed("etc/old.conf", "stale\n");

    fixture
        .apply("web3")
        .arg("--fix")
        .assert()
        .success()
        .stdout(predicate::str::contains("delete /etc/old.conf"));
    assert!(!fixture.root().join("etc/old.conf").exists());
    assert!(fixture.root().join("etc/old.conf.saved").exists());
}

#[test]
fn test_apply_ignored_node() {
    let fixture = TestFixture::new()
        .with_config(configs::CLUSTER)
        .with_overlay("all/etc/motd", "hello\n");

    fixture
        .apply("spare1")
        .arg("--fix")
        .assert()
        .success()
        .stdout(predicate::str::contains("spare1 is ignored"));
    assert!(!fixture.root().join("etc/motd").exists());
}

#[test]
fn test_apply_unknown_node() {
    let fixture = TestFixture::new().with_config(configs::CLUSTER);
    fixture
        .apply("web9")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown node 'web9'"));
}

#[test]
fn test_apply_detects_node_from_hostname() {
    let fixture = TestFixture::new()
        .with_config(configs::CLUSTER)
        .with_overlay("all/etc/role._db", "database\n");

    fixture
        .command()
        .env("HOSTNAME", "db1.example.com")
        .arg("apply")
        .arg("--root")
        .arg(fixture.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("would create /etc/role"));
}

#[test]
fn test_apply_without_detectable_node() {
    let fixture = TestFixture::new().with_config(configs::CLUSTER);
    fixture
        .command()
        .arg("apply")
        .assert()
        .failure()
        .stderr(predicate::str::contains("use --node"));
}

#[test]
fn test_apply_failing_hook_exits_nonzero() {
    let fixture = TestFixture::new()
        .with_config(configs::CLUSTER)
        .with_overlay("all/etc/motd", "new\n")
        .with_script("all/etc/motd.post", "exit 2");

    fixture
        .apply("web1")
        .arg("--fix")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Hook script failed"));
    // the file itself was still installed
    assert!(fixture.root().join("etc/motd").exists());
}
