//! End-to-end tests for the `nodes`, `info` and `reference` commands.

mod common;
use common::prelude::*;

fn cluster() -> TestFixture {
    TestFixture::new().with_config(configs::CLUSTER)
}

#[test]
fn test_nodes_lists_all_but_ignored() {
    cluster()
        .command()
        .arg("nodes")
        .assert()
        .success()
        .stdout("web1\nweb2\nweb3\nweb4\ndb1\n");
}

#[test]
fn test_nodes_selection_options() {
    cluster()
        .command()
        .args(["nodes", "--group", "web", "--exclude", "web[2-3]"])
        .assert()
        .success()
        .stdout("web1\nweb4\n");

    cluster()
        .command()
        .args(["nodes", "-g", "cluster", "-X", "web"])
        .assert()
        .success()
        .stdout("db1\n");
}

#[test]
fn test_nodes_compress() {
    cluster()
        .command()
        .args(["nodes", "--compress", "--node", "web1,web2,web4"])
        .assert()
        .success()
        .stdout("web[1-2,4]\n");
}

#[test]
fn test_nodes_long_shows_address() {
    cluster()
        .command()
        .args(["nodes", "--long", "--node", "web3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("web3 groups=web,all address=10.0.0.13"));
}

#[test]
fn test_nodes_unknown_group() {
    cluster()
        .command()
        .args(["nodes", "--group", "nosuch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown group 'nosuch'"));
}

#[test]
fn test_info_summary() {
    cluster()
        .command()
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("nodes:      6"))
        .stdout(predicate::str::contains("ignored:    spare1"));
}

#[test]
fn test_info_node() {
    cluster()
        .command()
        .args(["info", "--node", "db1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("groups:   db1 db all"))
        .stdout(predicate::str::contains("hostname: db1.example.com"));
}

#[test]
fn test_reference_shows_winning_source() {
    let fixture = cluster()
        .with_overlay("all/etc/hosts", "generic")
        .with_overlay("all/etc/hosts._web", "web")
        .with_overlay("all/etc/hosts._web.post", "#!/bin/sh\n");

    fixture
        .command()
        .args(["reference", "--node", "web1", "/etc/hosts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/etc/hosts overlay/all/etc/hosts._web"))
        .stdout(predicate::str::contains("post: overlay/all/etc/hosts._web.post"));
}

#[test]
fn test_reference_missing_destination() {
    cluster()
        .with_overlay("all/etc/hosts", "generic")
        .command()
        .args(["reference", "--node", "db1", "/etc/passwd"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("/etc/passwd (not in repository)"));
}
