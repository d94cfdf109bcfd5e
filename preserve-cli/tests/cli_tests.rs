use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

const SCRUBBED_ENV: &[&str] = &[
    "PRESERVE_CONFIG",
    "PRESERVE_MANIFEST",
    "PRESERVE_STATE_BIN",
    "PRESERVE_JQ",
    "PRESERVED_FILES_LOCATION",
    "PRESERVE_PLAN_LOCATION",
    "PRESERVED_FILES_SHA256",
    "PRESERVE_HANDOFF",
    "PRESERVE_EXTRACT_ROOT",
    "AWS_ENDPOINT_URL",
];

fn preserve_cmd(workdir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("preserve"));
    cmd.current_dir(workdir)
        .env("AWS_REGION", "us-east-1")
        .env("AWS_EC2_METADATA_DISABLED", "true")
        .env("NO_COLOR", "1");
    for var in SCRUBBED_ENV {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn help_lists_commands() {
    let dir = TempDir::new().unwrap();
    preserve_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("push").and(contains("pull")).and(contains("list")).and(contains("clean")));
}

#[test]
fn pull_without_location_is_a_successful_no_op() {
    let dir = TempDir::new().unwrap();
    preserve_cmd(dir.path())
        .arg("pull")
        .assert()
        .success()
        .stderr(contains("no remote location"))
        .stdout(contains("Nothing pulled"));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn list_without_location_succeeds() {
    let dir = TempDir::new().unwrap();
    preserve_cmd(dir.path()).arg("list").assert().success();
}

#[test]
fn push_without_location_exits_one() {
    let dir = TempDir::new().unwrap();
    preserve_cmd(dir.path())
        .args(["push", "--no-state-query"])
        .assert()
        .code(1)
        .stderr(contains("no remote location configured"));
    assert!(!dir.path().join("preserved_files.tar.gz").exists());
}

#[test]
fn push_with_missing_jq_exits_one() {
    let dir = TempDir::new().unwrap();
    preserve_cmd(dir.path())
        .args([
            "push",
            "--plan-location",
            "s3://bucket/path/id.plan",
            "--jq",
            "preserve-no-such-jq",
        ])
        .assert()
        .code(1)
        .stderr(contains("preserve-no-such-jq"));
}

#[test]
fn malformed_config_file_exits_one() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("preserve.yaml"), "region: [unclosed").unwrap();
    preserve_cmd(dir.path())
        .args(["--config", "preserve.yaml", "pull"])
        .assert()
        .code(1)
        .stderr(contains("preserve.yaml"));
}

#[test]
fn clean_requires_a_target() {
    let dir = TempDir::new().unwrap();
    preserve_cmd(dir.path()).arg("clean").assert().failure();
}

#[test]
fn clean_archives_and_files() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("harness.json"),
        r#"{"preserved_files": ["out/kubeconfig", "gone.txt"]}"#,
    )
    .unwrap();
    fs::create_dir_all(dir.path().join("out")).unwrap();
    fs::write(dir.path().join("out/kubeconfig"), "apiVersion: v1\n").unwrap();
    fs::write(dir.path().join("preserved_files.tar.gz"), "x").unwrap();
    fs::write(dir.path().join("notes.txt"), "keep").unwrap();

    preserve_cmd(dir.path())
        .args(["clean", "--files", "--archives"])
        .assert()
        .success()
        .stdout(
            contains("out/kubeconfig")
                .and(contains("preserved_files.tar.gz"))
                .and(contains("removed 2 file(s)")),
        );
    assert!(!dir.path().join("out/kubeconfig").exists());
    assert!(!dir.path().join("preserved_files.tar.gz").exists());
    assert!(dir.path().join("notes.txt").exists());
}
