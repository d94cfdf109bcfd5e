//! Config file loading.

use assert_fs::prelude::*;
use preserve_core::{ConfigError, PreserveConfig};

#[test]
fn missing_config_file_is_io_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = dir.child("absent.yaml");
    let err = PreserveConfig::load_at(path.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }), "got: {err}");
    assert!(err.to_string().contains("absent.yaml"));
}

#[test]
fn empty_config_file_is_default() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("preserve.yaml");
    file.write_str("\n").expect("write");
    let cfg = PreserveConfig::load_at(file.path()).expect("load");
    assert_eq!(cfg, PreserveConfig::default());
}

#[test]
fn full_config_file_roundtrip() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("preserve.yaml");
    let mut cfg = PreserveConfig::default();
    cfg.explicit_location = Some("s3://bucket/app/state_preserved_files.tar.gz".into());
    cfg.restore_absolute_prefixes = vec!["home/".into()];
    cfg.tagging.environment = Some("staging".into());
    file.write_str(&serde_yaml::to_string(&cfg).expect("serialize"))
        .expect("write");

    let loaded = PreserveConfig::load_at(file.path()).expect("load");
    assert_eq!(loaded, cfg);
}

#[test]
fn wrong_type_is_parse_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("preserve.yaml");
    file.write_str("- a list, not a mapping\n").expect("write");
    let err = PreserveConfig::load_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}
