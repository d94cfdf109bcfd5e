//! Domain types for the preservation pipeline.
//!
//! Optional attributes are `Option<String>`; absence is never encoded as a
//! placeholder string.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Declarative list of paths to preserve. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub preserved_files: Vec<String>,
}

// ---------------------------------------------------------------------------
// Infra-state resources
// ---------------------------------------------------------------------------

/// Attributes of a managed file resource.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileAttributes {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub content_base64: Option<String>,
    #[serde(default)]
    pub file_permission: Option<String>,
    #[serde(default)]
    pub directory_permission: Option<String>,
}

/// One resource instance from an infra-state export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateResource {
    #[serde(default)]
    pub address: Option<String>,
    pub mode: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub attributes: FileAttributes,
}

impl StateResource {
    pub const MANAGED_MODE: &'static str = "managed";
    pub const LOCAL_FILE_TYPE: &'static str = "local_file";

    /// Only managed `local_file` resources carry files worth preserving.
    pub fn is_managed_local_file(&self) -> bool {
        self.mode == Self::MANAGED_MODE && self.resource_type == Self::LOCAL_FILE_TYPE
    }

    pub fn has_inline_content(&self) -> bool {
        self.attributes.content.is_some() || self.attributes.content_base64.is_some()
    }
}

// ---------------------------------------------------------------------------
// CollectedPathSet
// ---------------------------------------------------------------------------

/// Normalizes one candidate path.
///
/// Returns `None` for paths with a `..` segment anywhere and for paths that
/// are empty once leading `./` prefixes are removed.
pub fn normalize_candidate(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.split(['/', '\\']).any(|segment| segment == "..") {
        return None;
    }
    let mut path = raw;
    while let Some(rest) = path.strip_prefix("./") {
        path = rest.trim_start_matches('/');
    }
    if path.is_empty() || path == "." {
        return None;
    }
    Some(path.to_string())
}

/// Deduplicated, normalized, sorted set of paths slated for preservation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CollectedPathSet {
    paths: Vec<String>,
    /// Accepted candidates before deduplication.
    pub total_collected: usize,
    pub duplicates_removed: usize,
    /// Candidates silently dropped for containing a `..` segment.
    pub unsafe_rejected: usize,
}

impl CollectedPathSet {
    /// Builds the set from raw candidates, in any order, from any number of
    /// sources.
    pub fn from_candidates<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut total_collected = 0;
        let mut unsafe_rejected = 0;
        let mut unique = BTreeSet::new();
        for candidate in candidates {
            let candidate = candidate.as_ref();
            if candidate.trim().is_empty() {
                continue;
            }
            match normalize_candidate(candidate) {
                Some(path) => {
                    total_collected += 1;
                    unique.insert(path);
                }
                None => unsafe_rejected += 1,
            }
        }
        let paths: Vec<String> = unique.into_iter().collect();
        Self {
            duplicates_removed: total_collected - paths.len(),
            total_collected,
            unsafe_rejected,
            paths,
        }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn unique_files(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.binary_search_by(|p| p.as_str().cmp(path)).is_ok()
    }
}

// ---------------------------------------------------------------------------
// RemoteLocation
// ---------------------------------------------------------------------------

/// Object-storage address of a stored archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteLocation {
    pub bucket: String,
    pub key: String,
}

impl RemoteLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Splits `[scheme://]bucket/key` at the first `/` without altering the key.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = strip_scheme(raw.trim());
        match trimmed.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
                Ok(Self::new(bucket, key))
            }
            _ => Err(ConfigError::InvalidLocation(raw.to_string())),
        }
    }

    pub fn uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }

    /// Directory part of the key, including the trailing `/` (empty at bucket root).
    pub fn key_prefix(&self) -> &str {
        match self.key.rfind('/') {
            Some(idx) => &self.key[..=idx],
            None => "",
        }
    }
}

impl fmt::Display for RemoteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Removes a leading `scheme://`, if any.
pub fn strip_scheme(raw: &str) -> &str {
    match raw.find("://") {
        Some(idx) => &raw[idx + 3..],
        None => raw,
    }
}

// ---------------------------------------------------------------------------
// TagSet
// ---------------------------------------------------------------------------

/// Ordered `key=value` metadata attached to a stored archive.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TagSet(Vec<(String, String)>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renders `k=v&k=v` with URL-encoded keys and values.
    pub fn to_query_string(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Parses a `k=v&k=v` string; undecodable pairs are kept as-is.
    pub fn parse_query(raw: &str) -> Self {
        let decode = |s: &str| {
            urlencoding::decode(s)
                .map(|c| c.into_owned())
                .unwrap_or_else(|_| s.to_string())
        };
        Self(
            raw.split('&')
                .filter(|pair| !pair.is_empty())
                .map(|pair| match pair.split_once('=') {
                    Some((k, v)) => (decode(k), decode(v)),
                    None => (decode(pair), String::new()),
                })
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
