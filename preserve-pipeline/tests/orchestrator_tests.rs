//! End-to-end orchestrator runs against the in-memory store.
//!
//! Each test uses isolated `TempDir` workspaces: one for the "apply" host and
//! one for the later "plan" host.

use std::fs;
use std::path::Path;

use assert_fs::prelude::*;
use predicates::prelude::predicate;
use preserve_collector::{BuiltinJsonQuery, JqQuery};
use preserve_core::{Degradation, ErrorKind, Outcome, PreserveConfig, RemoteLocation};
use preserve_pipeline::{Orchestrator, Stage, DEFAULT_ARCHIVE_NAME};
use preserve_remote::MemoryObjectStore;
use rstest::rstest;

const PLAN: &str = "s3://bucket/path/id.plan";

fn derived() -> RemoteLocation {
    RemoteLocation::new("bucket", "path/id_preserved_files.tar.gz")
}

fn config() -> PreserveConfig {
    PreserveConfig {
        plan_location: Some(PLAN.to_string()),
        ..PreserveConfig::default()
    }
}

fn apply_host() -> assert_fs::TempDir {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("harness.json")
        .write_str(r#"{"preserved_files": ["a/x.txt", "./a/x.txt", "b/y.txt", "../etc/passwd"]}"#)
        .unwrap();
    dir.child("a/x.txt").write_str("generated x\n").unwrap();
    dir.child("b/y.txt").write_str("generated y\n").unwrap();
    dir
}

fn archive() -> &'static Path {
    Path::new(DEFAULT_ARCHIVE_NAME)
}

// ---------------------------------------------------------------------------
// 1. push
// ---------------------------------------------------------------------------

#[test]
fn push_collects_archives_uploads_and_writes_handoff() {
    let host = apply_host();
    let cfg = config();
    let json = BuiltinJsonQuery;
    let store = MemoryObjectStore::new();

    let outcome = Orchestrator::new(&cfg, &json, None, &store, host.path()).push(archive());
    assert!(outcome.is_success(), "{outcome:?}");
    let report = outcome.value().unwrap();

    assert_eq!(report.location, derived());
    assert_eq!(report.collected.total_collected, 3);
    assert_eq!(report.collected.duplicates_removed, 1);
    assert_eq!(report.collected.unique_files(), 2);
    assert_eq!(report.archive.existing_count, 2);
    assert_eq!(
        report.trail.stages(),
        [Stage::Idle, Stage::Collecting, Stage::Archiving, Stage::Syncing, Stage::Done]
    );

    let stored = store.object(&derived()).expect("uploaded");
    assert_eq!(stored.body, fs::read(host.path().join(DEFAULT_ARCHIVE_NAME)).unwrap());
    let tags = stored.tags.expect("tagged");
    assert_eq!(tags.get("deployment_id"), Some("id"));
    assert_eq!(tags.get("owner"), Some("unknown"));

    host.child("preserve.env")
        .assert(predicate::str::contains(
            "export PRESERVED_FILES_LOCATION='s3://bucket/path/id_preserved_files.tar.gz'",
        ))
        .assert(predicate::str::contains(format!(
            "export PRESERVED_FILES_SHA256='{}'",
            report.sha256
        )));
}

#[test]
fn push_without_location_is_fatal() {
    let host = apply_host();
    let cfg = PreserveConfig::default();
    let json = BuiltinJsonQuery;
    let store = MemoryObjectStore::new();

    match Orchestrator::new(&cfg, &json, None, &store, host.path()).push(archive()) {
        Outcome::Fatal(err) => assert_eq!(err.kind(), ErrorKind::Config),
        other => panic!("expected fatal, got {other:?}"),
    }
    assert_eq!(store.put_attempts(), 0);
    host.child(DEFAULT_ARCHIVE_NAME).assert(predicate::path::missing());
}

#[test]
fn push_with_missing_files_still_uploads() {
    let host = assert_fs::TempDir::new().unwrap();
    host.child("harness.json")
        .write_str(r#"{"preserved_files": ["missing.txt"]}"#)
        .unwrap();
    let cfg = config();
    let json = BuiltinJsonQuery;
    let store = MemoryObjectStore::new();

    let outcome = Orchestrator::new(&cfg, &json, None, &store, host.path()).push(archive());
    assert!(outcome.is_degraded());
    assert!(matches!(outcome.degradations()[0], Degradation::MissingFiles { .. }));
    assert_eq!(outcome.value().unwrap().trail.current(), Stage::Degraded);
    assert!(store.object(&derived()).is_some());
}

#[test]
fn push_falls_back_to_untagged_upload() {
    let host = apply_host();
    let cfg = config();
    let json = BuiltinJsonQuery;
    let store = MemoryObjectStore::new().rejecting_tagged_writes();

    let outcome = Orchestrator::new(&cfg, &json, None, &store, host.path()).push(archive());
    assert!(outcome.is_degraded());
    assert!(matches!(
        outcome.degradations()[0],
        Degradation::UntaggedFallback { .. }
    ));
    assert_eq!(store.object(&derived()).unwrap().tags, None);
    host.child("preserve.env").assert(predicate::path::is_file());
}

#[test]
fn push_fails_when_both_uploads_fail() {
    let host = apply_host();
    let cfg = config();
    let json = BuiltinJsonQuery;
    let store = MemoryObjectStore::new().rejecting_writes();

    let outcome = Orchestrator::new(&cfg, &json, None, &store, host.path()).push(archive());
    match outcome {
        Outcome::Fatal(err) => assert_eq!(err.kind(), ErrorKind::TransferFailure),
        other => panic!("expected fatal, got {other:?}"),
    }
    host.child("preserve.env").assert(predicate::path::missing());
}

#[test]
fn push_with_missing_jq_is_fatal() {
    let host = apply_host();
    let cfg = config();
    let json = JqQuery::new("preserve-no-such-jq");
    let store = MemoryObjectStore::new();

    match Orchestrator::new(&cfg, &json, None, &store, host.path()).push(archive()) {
        Outcome::Fatal(err) => assert_eq!(err.kind(), ErrorKind::ToolMissing),
        other => panic!("expected fatal, got {other:?}"),
    }
}

#[test]
fn explicit_location_overrides_plan() {
    let host = apply_host();
    let cfg = PreserveConfig {
        explicit_location: Some("s3://other/exact.tar.gz".into()),
        ..config()
    };
    let json = BuiltinJsonQuery;
    let store = MemoryObjectStore::new();

    let outcome = Orchestrator::new(&cfg, &json, None, &store, host.path()).push(archive());
    assert!(!outcome.is_fatal());
    assert!(store.object(&RemoteLocation::new("other", "exact.tar.gz")).is_some());
    assert!(store.object(&derived()).is_none());
}

// ---------------------------------------------------------------------------
// 2. pull
// ---------------------------------------------------------------------------

fn pushed_store() -> (MemoryObjectStore, String) {
    let host = apply_host();
    let cfg = config();
    let json = BuiltinJsonQuery;
    let store = MemoryObjectStore::new();
    let outcome = Orchestrator::new(&cfg, &json, None, &store, host.path()).push(archive());
    let sha = outcome.value().expect("push").sha256.clone();
    (store, sha)
}

#[rstest]
#[case(false)]
#[case(true)]
fn pull_restores_files_on_a_fresh_host(#[case] keep_archive: bool) {
    let (store, _) = pushed_store();
    let plan_host = assert_fs::TempDir::new().unwrap();
    let cfg = config();
    let json = BuiltinJsonQuery;

    let outcome =
        Orchestrator::new(&cfg, &json, None, &store, plan_host.path()).pull(archive(), keep_archive);
    assert!(outcome.is_success(), "{outcome:?}");
    let report = outcome.value().unwrap();
    assert_eq!(report.trail.stages(), [Stage::Idle, Stage::Syncing, Stage::Done]);
    assert_eq!(report.archive_kept, keep_archive);

    plan_host.child("a/x.txt").assert("generated x\n");
    plan_host.child("b/y.txt").assert("generated y\n");
    assert_eq!(plan_host.child(DEFAULT_ARCHIVE_NAME).path().exists(), keep_archive);
}

#[test]
fn pull_without_location_is_a_no_op() {
    let plan_host = assert_fs::TempDir::new().unwrap();
    let cfg = PreserveConfig::default();
    let json = BuiltinJsonQuery;
    let store = MemoryObjectStore::new();

    let outcome = Orchestrator::new(&cfg, &json, None, &store, plan_host.path()).pull(archive(), false);
    assert!(!outcome.is_fatal());
    assert_eq!(outcome.degradations(), &[Degradation::NoRemoteLocation]);
    let report = outcome.value().unwrap();
    assert!(report.location.is_none());
    assert_eq!(report.trail.stages(), [Stage::Idle, Stage::Degraded]);
    assert_eq!(fs::read_dir(plan_host.path()).unwrap().count(), 0);
}

#[test]
fn pull_of_missing_object_degrades() {
    let plan_host = assert_fs::TempDir::new().unwrap();
    let cfg = config();
    let json = BuiltinJsonQuery;
    let store = MemoryObjectStore::new();

    let outcome = Orchestrator::new(&cfg, &json, None, &store, plan_host.path()).pull(archive(), false);
    assert!(outcome.is_degraded());
    assert!(matches!(
        outcome.degradations()[0],
        Degradation::RemoteObjectMissing { .. }
    ));
}

#[test]
fn pull_verifies_recorded_digest() {
    let (store, sha) = pushed_store();
    let plan_host = assert_fs::TempDir::new().unwrap();
    let cfg = PreserveConfig {
        expected_digest: Some(sha.to_uppercase()),
        ..config()
    };
    let json = BuiltinJsonQuery;

    let outcome = Orchestrator::new(&cfg, &json, None, &store, plan_host.path()).pull(archive(), false);
    assert!(outcome.is_success(), "{outcome:?}");
    plan_host.child("a/x.txt").assert(predicate::path::is_file());
}

#[test]
fn digest_mismatch_skips_extraction() {
    let (store, _) = pushed_store();
    let plan_host = assert_fs::TempDir::new().unwrap();
    let cfg = PreserveConfig {
        expected_digest: Some("0".repeat(64)),
        ..config()
    };
    let json = BuiltinJsonQuery;

    let outcome = Orchestrator::new(&cfg, &json, None, &store, plan_host.path()).pull(archive(), false);
    assert!(outcome.is_degraded());
    assert!(matches!(
        outcome.degradations()[0],
        Degradation::DigestMismatch { .. }
    ));
    plan_host.child("a/x.txt").assert(predicate::path::missing());
}

#[test]
fn corrupt_remote_archive_degrades() {
    let plan_host = assert_fs::TempDir::new().unwrap();
    let cfg = config();
    let json = BuiltinJsonQuery;
    let store = MemoryObjectStore::new();
    store.insert(&derived(), "definitely not gzip", None);

    let outcome = Orchestrator::new(&cfg, &json, None, &store, plan_host.path()).pull(archive(), false);
    assert!(!outcome.is_fatal());
    assert!(outcome.is_degraded());
}

// ---------------------------------------------------------------------------
// 3. list / list --remote
// ---------------------------------------------------------------------------

#[test]
fn list_enumerates_remote_entries() {
    let (store, _) = pushed_store();
    let elsewhere = assert_fs::TempDir::new().unwrap();
    let cfg = config();
    let json = BuiltinJsonQuery;

    let outcome = Orchestrator::new(&cfg, &json, None, &store, elsewhere.path()).list();
    assert!(outcome.is_success(), "{outcome:?}");
    let report = outcome.value().unwrap();
    assert_eq!(report.entries, ["a/x.txt", "b/y.txt"]);
    assert_eq!(report.count, 2);
    assert_eq!(fs::read_dir(elsewhere.path()).unwrap().count(), 0);
}

#[test]
fn list_without_location_degrades() {
    let dir = assert_fs::TempDir::new().unwrap();
    let cfg = PreserveConfig::default();
    let json = BuiltinJsonQuery;
    let store = MemoryObjectStore::new();
    let outcome = Orchestrator::new(&cfg, &json, None, &store, dir.path()).list();
    assert!(outcome.is_degraded());
    assert_eq!(outcome.value().unwrap().count, 0);
}

#[test]
fn list_remote_shows_sibling_archives() {
    let (store, _) = pushed_store();
    store.insert(&RemoteLocation::new("bucket", "path/other_preserved_files.tar.gz"), "x", None);
    store.insert(&RemoteLocation::new("bucket", "path/id.plan"), "plan", None);
    let dir = assert_fs::TempDir::new().unwrap();
    let cfg = config();
    let json = BuiltinJsonQuery;

    let outcome = Orchestrator::new(&cfg, &json, None, &store, dir.path()).list_remote();
    let listing = outcome.value().unwrap();
    assert_eq!(listing.prefix, "path/");
    let keys: Vec<_> = listing.archives.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(
        keys,
        ["path/id_preserved_files.tar.gz", "path/other_preserved_files.tar.gz"]
    );
}

// ---------------------------------------------------------------------------
// 4. clean
// ---------------------------------------------------------------------------

#[test]
fn clean_removes_manifest_files_and_archives() {
    let host = apply_host();
    host.child("old.tar.bz2").write_str("x").unwrap();
    let cfg = config();
    let json = BuiltinJsonQuery;
    let store = MemoryObjectStore::new();
    let orchestrator = Orchestrator::new(&cfg, &json, None, &store, host.path());

    let report = orchestrator.clean(true, true).into_result().unwrap().0;
    assert_eq!(report.removed, ["a/x.txt", "b/y.txt", "old.tar.bz2"]);
    host.child("a/x.txt").assert(predicate::path::missing());
    host.child("harness.json").assert(predicate::path::is_file());
}
