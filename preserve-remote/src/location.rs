//! Remote address resolution.

use std::path::Path;

use preserve_core::config::non_blank;
use preserve_core::types::strip_scheme;
use preserve_core::{ConfigError, RemoteLocation};

/// Appended to the plan key (minus its extension) to name the archive.
pub const ARCHIVE_KEY_SUFFIX: &str = "_preserved_files.tar.gz";

/// Plan-file extensions removed before the suffix is appended.
pub const PLAN_EXTENSIONS: &[&str] = &[".tfplan", ".plan"];

/// Explicit location wins verbatim; otherwise the location is derived from
/// the plan identifier. Blank values count as absent.
pub fn resolve_remote_location(
    explicit: Option<&str>,
    plan_identifier: Option<&str>,
) -> Result<RemoteLocation, ConfigError> {
    if let Some(explicit) = non_blank(explicit) {
        return RemoteLocation::parse(explicit);
    }
    match non_blank(plan_identifier) {
        Some(plan) => derive_from_plan(plan),
        None => Err(ConfigError::MissingLocation),
    }
}

/// `[s3://]bucket/path/id.plan` → `bucket` / `path/id_preserved_files.tar.gz`.
pub fn derive_from_plan(plan_identifier: &str) -> Result<RemoteLocation, ConfigError> {
    let plan = RemoteLocation::parse(plan_identifier)?;
    let stem = PLAN_EXTENSIONS
        .iter()
        .find_map(|ext| plan.key.strip_suffix(ext))
        .unwrap_or(plan.key.as_str());
    if stem.is_empty() || stem.ends_with('/') {
        return Err(ConfigError::InvalidLocation(plan_identifier.to_string()));
    }
    Ok(RemoteLocation::new(plan.bucket, format!("{stem}{ARCHIVE_KEY_SUFFIX}")))
}

/// File stem of the plan identifier's key (`path/id.plan` → `id`).
pub fn deployment_id(plan_identifier: &str) -> Option<String> {
    let trimmed = strip_scheme(plan_identifier.trim());
    let (_, key) = trimmed.split_once('/')?;
    Path::new(key)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_extension_is_replaced() {
        let loc = derive_from_plan("s3://bucket/path/id.plan").unwrap();
        assert_eq!(loc.uri(), "s3://bucket/path/id_preserved_files.tar.gz");
        let loc = derive_from_plan("bucket/id.tfplan").unwrap();
        assert_eq!(loc.key, "id_preserved_files.tar.gz");
    }

    #[test]
    fn key_without_extension_gets_suffix() {
        let loc = derive_from_plan("bucket/runs/42").unwrap();
        assert_eq!(loc.key, "runs/42_preserved_files.tar.gz");
    }

    #[test]
    fn bare_extension_is_invalid() {
        assert!(derive_from_plan("bucket/.plan").is_err());
        assert!(derive_from_plan("bucket").is_err());
    }

    #[test]
    fn deployment_id_is_file_stem() {
        assert_eq!(deployment_id("s3://b/path/id.plan").as_deref(), Some("id"));
        assert_eq!(deployment_id("b/run-7").as_deref(), Some("run-7"));
        assert_eq!(deployment_id("bucket-only"), None);
    }
}
