//! Run configuration.
//!
//! A single [`PreserveConfig`] is built at the entry point (defaults → optional
//! YAML file → environment / flags) and passed by reference to every
//! component. Nothing below the CLI reads the environment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Deployment-context fields used to synthesize tags.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentContext {
    pub commit_id: Option<String>,
    pub environment: Option<String>,
    pub business_unit: Option<String>,
    pub product: Option<String>,
    pub owner: Option<String>,
}

/// Configuration for one preservation invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreserveConfig {
    /// JSON manifest with a `preserved_files` array.
    pub manifest_path: PathBuf,

    /// Binary that exports infra-state as JSON (`<bin> show -json`).
    pub state_query_bin: String,

    /// Working directory for the state query; current directory when unset.
    pub state_query_dir: Option<PathBuf>,

    /// External JSON query binary (e.g. `jq`). The built-in parser is used when unset.
    pub json_query_bin: Option<String>,

    /// Object storage region.
    pub region: String,

    /// Object storage endpoint override (e.g. MinIO in testing).
    pub endpoint_url: Option<String>,

    /// Explicit `[s3://]bucket/key`, used verbatim.
    pub explicit_location: Option<String>,

    /// Plan identifier location the archive key is derived from.
    pub plan_location: Option<String>,

    pub tagging: DeploymentContext,

    /// Sourceable file written after a successful push.
    pub handoff_path: PathBuf,

    /// Directory archive entries are restored under.
    pub extract_root: PathBuf,

    /// Entry prefixes (e.g. `home/`) restored at the filesystem root instead
    /// of under `extract_root`. Empty by default.
    pub restore_absolute_prefixes: Vec<String>,

    /// Expected archive SHA-256, verified on pull when set.
    pub expected_digest: Option<String>,
}

impl Default for PreserveConfig {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from("harness.json"),
            state_query_bin: "terraform".to_string(),
            state_query_dir: None,
            json_query_bin: None,
            region: "us-east-1".to_string(),
            endpoint_url: None,
            explicit_location: None,
            plan_location: None,
            tagging: DeploymentContext::default(),
            handoff_path: PathBuf::from("preserve.env"),
            extract_root: PathBuf::from("."),
            restore_absolute_prefixes: Vec::new(),
            expected_digest: None,
        }
    }
}

impl PreserveConfig {
    /// Loads a YAML config file. Missing keys take their defaults.
    ///
    /// Returns `ConfigError::Parse` (with path + line context) if malformed YAML.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// True when pull/list have something to resolve a location from.
    pub fn has_location_source(&self) -> bool {
        non_blank(self.explicit_location.as_deref()).is_some()
            || non_blank(self.plan_location.as_deref()).is_some()
    }
}

/// Treats empty and whitespace-only strings as absent.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
