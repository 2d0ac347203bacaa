//! Integration tests for CLI commands.
//!
//! Tests that verify command functionality end-to-end against fixtures in a
//! temporary directory.

#![allow(deprecated)] // Command::cargo_bin is deprecated but replacement requires newer assert_cmd

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const FIXTURE: &str = r#"
[attributes]
clearance = "integer"
department = "string"

[users.alice]
clearance = 3
department = "engineering"

[users.bob]
clearance = 1
department = "engineering"

[policies]
cleared-engineers = [
    { attribute = "clearance", operator = ">", value = "2" },
    { attribute = "department", operator = "starts_with", value = "eng" },
]

[resources]
design-docs = ["cleared-engineers"]
"#;

fn write_fixture(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("fixture.toml");
    fs::write(&path, content).unwrap();
    path
}

fn tessera(project: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tessera").unwrap();
    cmd.arg("--no-color")
        .arg("--project")
        .arg(project.path())
        .env_remove("RUST_LOG");
    cmd
}

// ============================================================================
// Basics
// ============================================================================

#[test]
fn version_shows_package_name() {
    let temp = TempDir::new().unwrap();
    tessera(&temp)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tessera-cli"))
        .stdout(predicate::str::contains("integer: > < ="))
        .stdout(predicate::str::contains("string: = starts_with"));
}

#[test]
fn help_lists_commands() {
    Command::cargo_bin("tessera")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn check_requires_user_and_resource() {
    let temp = TempDir::new().unwrap();
    let fixture = write_fixture(&temp, FIXTURE);
    tessera(&temp)
        .arg("check")
        .arg(&fixture)
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

// ============================================================================
// Check Command
// ============================================================================

#[test]
fn check_grants_and_then_serves_from_cache() {
    let temp = TempDir::new().unwrap();
    let fixture = write_fixture(&temp, FIXTURE);
    tessera(&temp)
        .arg("check")
        .arg(&fixture)
        .args(["--user", "alice", "--resource", "design-docs", "--repeat", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#1 granted by cleared-engineers (recomputed)"))
        .stdout(predicate::str::contains("#2 granted by cleared-engineers (cached grant)"));
}

#[test]
fn check_denies_and_caches_denial() {
    let temp = TempDir::new().unwrap();
    let fixture = write_fixture(&temp, FIXTURE);
    tessera(&temp)
        .arg("check")
        .arg(&fixture)
        .args(["--user", "bob", "--resource", "design-docs", "-n", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#1 denied (recomputed)"))
        .stdout(predicate::str::contains("#2 denied (cached denial)"))
        .stdout(predicate::str::contains("No policy bound to the resource"));
}

#[test]
fn check_unknown_user_is_denied() {
    let temp = TempDir::new().unwrap();
    let fixture = write_fixture(&temp, FIXTURE);
    tessera(&temp)
        .arg("check")
        .arg(&fixture)
        .args(["--user", "mallory", "--resource", "design-docs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("denied"));
}

#[test]
fn check_json_output() {
    let temp = TempDir::new().unwrap();
    let fixture = write_fixture(&temp, FIXTURE);
    tessera(&temp)
        .arg("check")
        .arg(&fixture)
        .args(["--user", "alice", "--resource", "design-docs", "-n", "2", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#"{"allowed":true,"granting_policy":"cleared-engineers","source":"recomputed"}"#,
        ))
        .stdout(predicate::str::contains(r#""source":"cached-grant""#));
}

#[test]
fn check_negative_cache_override_is_reported() {
    let temp = TempDir::new().unwrap();
    let fixture = write_fixture(&temp, FIXTURE);
    tessera(&temp)
        .arg("check")
        .arg(&fixture)
        .args(["--user", "bob", "--resource", "design-docs"])
        .args(["--negative-cache", "verify-policies"])
        .assert()
        .success()
        .stdout(predicate::str::contains("verify-policies"));
}

#[test]
fn check_audits_decisions_to_stderr() {
    let temp = TempDir::new().unwrap();
    let fixture = write_fixture(&temp, FIXTURE);
    tessera(&temp)
        .arg("check")
        .arg(&fixture)
        .args(["--user", "alice", "--resource", "design-docs"])
        .env("RUST_LOG", "info")
        .assert()
        .success()
        .stderr(predicate::str::contains("Resource access granted"));
}

#[test]
fn check_missing_fixture_fails() {
    let temp = TempDir::new().unwrap();
    tessera(&temp)
        .arg("check")
        .arg(temp.path().join("nope.toml"))
        .args(["--user", "alice", "--resource", "design-docs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read fixture"));
}

#[test]
fn check_rejects_operator_not_allowed_for_type() {
    let temp = TempDir::new().unwrap();
    let fixture = write_fixture(
        &temp,
        r#"
[attributes]
clearance = "integer"

[policies]
bad = [{ attribute = "clearance", operator = "starts_with", value = "1" }]
"#,
    );
    tessera(&temp)
        .arg("check")
        .arg(&fixture)
        .args(["--user", "alice", "--resource", "design-docs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("policy 'bad'"));
}

// ============================================================================
// Config Commands
// ============================================================================

#[test]
fn config_show_defaults() {
    let temp = TempDir::new().unwrap();
    tessera(&temp)
        .args(["config", "show"])
        .env_remove("TESSERA_ENGINE__NEGATIVE_CACHE")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tessera Configuration"))
        .stdout(predicate::str::contains("Negative cache"));
}

#[test]
fn config_show_reads_project_file() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("tessera.toml"),
        "[engine]\nnegative_cache = \"verify-policies\"\naudit = false\n",
    )
    .unwrap();

    tessera(&temp)
        .args(["config", "show", "--format", "toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[engine]"))
        .stdout(predicate::str::contains("negative_cache = \"verify-policies\""))
        .stdout(predicate::str::contains("audit = false"));
}

#[test]
fn config_show_lists_merged_files() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("tessera.toml"), "[engine]\naudit = false\n").unwrap();
    fs::write(temp.path().join("tessera.local.toml"), "[logging]\nlevel = \"warn\"\n").unwrap();

    tessera(&temp)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Files:"))
        .stdout(predicate::str::contains("tessera.toml"))
        .stdout(predicate::str::contains("tessera.local.toml"))
        .stdout(predicate::str::contains("Level: warn"));
}

#[test]
fn config_show_environment_overrides_file() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("tessera.toml"),
        "[engine]\nnegative_cache = \"trust-resource\"\n",
    )
    .unwrap();

    tessera(&temp)
        .args(["config", "show", "--format", "json"])
        .env("TESSERA_ENGINE__NEGATIVE_CACHE", "verify-policies")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""negative_cache": "verify-policies""#));
}

#[test]
fn config_show_rejects_unknown_format() {
    let temp = TempDir::new().unwrap();
    tessera(&temp)
        .args(["config", "show", "--format", "yaml"])
        .assert()
        .failure();
}
