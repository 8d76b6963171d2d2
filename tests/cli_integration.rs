//! CLI integration tests for berth.
//!
//! These drive the binary through project setup, wiring and the local
//! targets. Nothing here needs docker, helm or a cloud account.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the berth binary command, isolated from the user's global config.
fn berth(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("berth").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env_remove("RUST_LOG");
    cmd
}

/// A project `shop` with api `svc` (8080) and postgres `store`.
fn shop() -> TempDir {
    let tmp = TempDir::new().unwrap();
    berth(tmp.path())
        .args(["init", "--name", "shop"])
        .assert()
        .success();
    berth(tmp.path())
        .args([
            "resource", "add", "svc", "--kind", "api", "--port", "8080", "--command", "npm start",
        ])
        .assert()
        .success();
    berth(tmp.path())
        .args(["resource", "add", "store", "--kind", "database"])
        .assert()
        .success();
    tmp
}

// ============================================================================
// berth init
// ============================================================================

#[test]
fn test_init_creates_manifest_and_secrets_dir() {
    let tmp = TempDir::new().unwrap();

    berth(tmp.path())
        .args(["init", "--name", "shop"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Created"));

    let manifest = fs::read_to_string(tmp.path().join("Berth.toml")).unwrap();
    assert!(manifest.contains("name = \"shop\""));
    assert!(manifest.contains("provider = \"gcp\""));
    assert!(tmp.path().join(".berth/secrets").is_dir());
    let gitignore = fs::read_to_string(tmp.path().join(".gitignore")).unwrap();
    assert!(gitignore.contains(".berth/secrets/"));
}

#[test]
fn test_init_fails_if_manifest_exists() {
    let tmp = TempDir::new().unwrap();
    berth(tmp.path())
        .args(["init", "--name", "shop"])
        .assert()
        .success();

    berth(tmp.path())
        .args(["init", "--name", "shop"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_commands_outside_project_fail() {
    let tmp = TempDir::new().unwrap();

    berth(tmp.path())
        .arg("tree")
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not find `Berth.toml`"))
        .stderr(predicate::str::contains("berth init"));
}

// ============================================================================
// berth resource / addon
// ============================================================================

#[test]
fn test_resource_add_and_list() {
    let tmp = shop();

    let manifest = fs::read_to_string(tmp.path().join("Berth.toml")).unwrap();
    assert!(manifest.contains("[resources.svc]"));
    assert!(manifest.contains("[resources.store]"));

    berth(tmp.path())
        .args(["resource", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("svc"))
        .stdout(predicate::str::contains("store"))
        .stdout(predicate::str::contains("5432"));
}

#[test]
fn test_resource_port_collision_fails() {
    let tmp = shop();

    berth(tmp.path())
        .args(["resource", "add", "admin", "--kind", "api", "--port", "8080"])
        .assert()
        .failure();

    let manifest = fs::read_to_string(tmp.path().join("Berth.toml")).unwrap();
    assert!(!manifest.contains("admin"));
}

#[test]
fn test_attach_to_unknown_resource_leaves_manifest() {
    let tmp = shop();
    berth(tmp.path())
        .args(["addon", "enable", "auth", "--port", "9000", "--serves", "svc"])
        .assert()
        .success();
    let before = fs::read_to_string(tmp.path().join("Berth.toml")).unwrap();

    berth(tmp.path())
        .args(["addon", "attach", "auth", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("`ghost` not found"));

    let after = fs::read_to_string(tmp.path().join("Berth.toml")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_remove_resource_detaches_addon() {
    let tmp = shop();
    berth(tmp.path())
        .args(["addon", "enable", "auth", "--port", "9000", "--serves", "svc"])
        .assert()
        .success();

    berth(tmp.path())
        .args(["resource", "remove", "svc"])
        .assert()
        .success();

    berth(tmp.path())
        .args(["addon", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(unattached)"));
}

// ============================================================================
// berth env / tree
// ============================================================================

#[test]
fn test_env_per_target() {
    let tmp = shop();

    berth(tmp.path())
        .args(["env", "svc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("storeHOST=127.0.0.1:5432"));

    berth(tmp.path())
        .args(["env", "svc", "--target", "test"])
        .assert()
        .success()
        .stdout(predicate::str::contains("storeHOST=store:5432"));
}

#[test]
fn test_env_unknown_entity_fails() {
    let tmp = shop();

    berth(tmp.path())
        .args(["env", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost"));
}

#[test]
fn test_tree_lists_databases_first() {
    let tmp = shop();

    let output = berth(tmp.path())
        .args(["tree", "--order"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let store = stdout.find("store").unwrap();
    let svc = stdout.find("svc").unwrap();
    assert!(store < svc);
}

#[test]
fn test_json_message_format() {
    let tmp = shop();

    berth(tmp.path())
        .args(["--message-format", "json", "resource", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"reason\":\"resource\""))
        .stdout(predicate::str::contains("\"name\":\"svc\""));
}

// ============================================================================
// berth run / test
// ============================================================================

#[test]
fn test_run_dry_run_prints_shell_line() {
    let tmp = shop();

    berth(tmp.path())
        .args(["run", "svc", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("storeHOST=127.0.0.1:5432"))
        .stdout(predicate::str::contains("npm start"));
}

#[test]
fn test_run_database_fails() {
    let tmp = shop();

    berth(tmp.path())
        .args(["run", "store", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot run as a local process"));
}

#[test]
fn test_test_no_up_writes_compose_file() {
    let tmp = shop();

    berth(tmp.path())
        .args(["test", "--no-up"])
        .assert()
        .success();

    let compose = fs::read_to_string(tmp.path().join("docker-compose.yml")).unwrap();
    assert!(compose.contains("svc:"));
    assert!(compose.contains("store:"));
    assert!(compose.contains("storeHOST: store:5432"));
}

// ============================================================================
// berth deploy / cluster
// ============================================================================

#[test]
fn test_deploy_without_main_cluster_fails() {
    let tmp = shop();

    berth(tmp.path())
        .args(["deploy", "--all"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no main cluster"))
        .stderr(predicate::str::contains("berth cluster provision"));
}

#[test]
fn test_cluster_list_empty() {
    let tmp = shop();

    berth(tmp.path())
        .args(["cluster", "list"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_cluster_use_unknown_fails() {
    let tmp = shop();

    berth(tmp.path())
        .args(["cluster", "use", "dev"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("`dev` not found"));
}

#[test]
fn test_completions() {
    let tmp = TempDir::new().unwrap();

    berth(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("berth"));
}
