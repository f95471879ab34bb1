//! Smoke tests for the netforge binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn demo_manifest() -> String {
    format!("{}/demos/two-vpc.yaml", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn test_help_lists_subcommands() {
    Command::cargo_bin("netforge")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("synth"))
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("destroy"));
}

#[test]
fn test_validate_demo_manifest_passes() {
    Command::cargo_bin("netforge")
        .unwrap()
        .args(["validate", &demo_manifest()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Validation passed"));
}

#[test]
fn test_synth_emits_json_document() {
    Command::cargo_bin("netforge")
        .unwrap()
        .args(["synth", &demo_manifest()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"topology\": \"two-vpc\""))
        .stdout(predicate::str::contains("\"kind\": \"peering\""));
}

#[test]
fn test_synth_emits_dot() {
    Command::cargo_bin("netforge")
        .unwrap()
        .args(["synth", &demo_manifest(), "--format", "dot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("digraph resources"));
}

#[test]
fn test_missing_manifest_fails_with_parse_exit_code() {
    Command::cargo_bin("netforge")
        .unwrap()
        .args(["validate", "no-such-file.yaml"])
        .assert()
        .failure()
        .code(4);
}

#[test]
fn test_deploy_plan_and_destroy_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let state_dir = dir.path().join("state");

    Command::cargo_bin("netforge")
        .unwrap()
        .args(["deploy", &demo_manifest()])
        .env("NETFORGE_STATE_DIR", &state_dir)
        .assert()
        .success();

    Command::cargo_bin("netforge")
        .unwrap()
        .args(["plan", &demo_manifest()])
        .env("NETFORGE_STATE_DIR", &state_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("No changes"));

    Command::cargo_bin("netforge")
        .unwrap()
        .args(["list"])
        .env("NETFORGE_STATE_DIR", &state_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("two-vpc"));

    Command::cargo_bin("netforge")
        .unwrap()
        .args(["destroy", "--deployment", "two-vpc"])
        .env("NETFORGE_STATE_DIR", &state_dir)
        .assert()
        .success();
}
