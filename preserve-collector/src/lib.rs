//! File discovery for `preserve-collector`.
//!
//! [`FileCollector::collect`] merges the manifest's `preserved_files` with the
//! filenames of managed `local_file` resources from an infra-state export,
//! then sanitizes, deduplicates and sorts them into a
//! [`CollectedPathSet`]. Only a missing JSON-query capability is fatal; every
//! other problem with either source degrades to "contributes nothing".

pub mod error;
pub mod json;
pub mod state;

use std::io::Write;
use std::path::Path;

use tracing::{debug, info, warn};

use preserve_core::{CollectedPathSet, Degradation, Outcome};

pub use error::CollectError;
pub use json::{BuiltinJsonQuery, JqQuery, JsonQuery};
pub use state::{CommandStateQuery, StateQuery};

use crate::error::io_err;

/// Gathers the set of paths to preserve.
pub struct FileCollector<'a> {
    json: &'a dyn JsonQuery,
}

impl<'a> FileCollector<'a> {
    pub fn new(json: &'a dyn JsonQuery) -> Self {
        Self { json }
    }

    /// Collects from the manifest at `manifest` (if given) and from `state`
    /// (if given).
    pub fn collect(
        &self,
        manifest: Option<&Path>,
        state: Option<&dyn StateQuery>,
    ) -> Outcome<CollectedPathSet> {
        if let Err(err) = self.json.ensure_available() {
            return Outcome::fatal(err);
        }

        let mut reasons = Vec::new();
        let mut candidates = Vec::new();

        if let Some(path) = manifest {
            match self.manifest_paths(path) {
                Ok(paths) => {
                    info!("manifest {} lists {} path(s)", path.display(), paths.len());
                    candidates.extend(paths);
                }
                Err(err) => {
                    warn!("ignoring manifest: {err}");
                    reasons.push(Degradation::ManifestMalformed {
                        path: path.to_path_buf(),
                        message: err.to_string(),
                    });
                }
            }
        }

        if let Some(state) = state {
            match self.state_paths(state) {
                Ok(paths) => {
                    info!("infra-state lists {} managed local file(s)", paths.len());
                    candidates.extend(paths);
                }
                Err(err) => {
                    warn!("continuing without infra-state: {err}");
                    reasons.push(Degradation::StateUnavailable {
                        reason: err.to_string(),
                    });
                }
            }
        }

        let set = CollectedPathSet::from_candidates(candidates);
        if set.unsafe_rejected > 0 {
            debug!("dropped {} path(s) with parent traversal", set.unsafe_rejected);
        }
        info!(
            "collected {} path(s): {} duplicate(s) removed, {} unique",
            set.total_collected,
            set.duplicates_removed,
            set.unique_files()
        );
        Outcome::from_parts(set, reasons)
    }

    /// Paths declared by the manifest. A missing manifest yields an empty list.
    pub fn manifest_paths(&self, path: &Path) -> Result<Vec<String>, CollectError> {
        if !path.exists() {
            debug!("manifest {} not found; nothing declared", path.display());
            return Ok(Vec::new());
        }
        self.json.preserved_files(path)
    }

    /// Filenames of managed `local_file` resources.
    ///
    /// The export is staged in a scoped temp file that is removed when this
    /// function returns, on every path.
    pub fn state_paths(&self, state: &dyn StateQuery) -> Result<Vec<String>, CollectError> {
        if !state.is_available() {
            return Err(CollectError::StateQuery {
                tool: state.name().to_string(),
                message: "tool is not installed or not runnable".to_string(),
            });
        }
        let export = state.export()?;

        let mut dump = tempfile::Builder::new()
            .prefix("preserve-state-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| io_err(std::env::temp_dir(), e))?;
        dump.write_all(&export)
            .and_then(|()| dump.flush())
            .map_err(|e| io_err(dump.path(), e))?;

        let resources = self.json.state_resources(dump.path())?;
        Ok(resources
            .into_iter()
            .filter(|r| r.is_managed_local_file())
            .filter_map(|r| {
                if r.attributes.filename.is_none() {
                    debug!("{:?} has no filename attribute", r.address);
                }
                r.attributes.filename
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unavailable;

    impl StateQuery for Unavailable {
        fn name(&self) -> &str {
            "terraform"
        }
        fn is_available(&self) -> bool {
            false
        }
        fn export(&self) -> Result<Vec<u8>, CollectError> {
            unreachable!("export must not be called when unavailable")
        }
    }

    #[test]
    fn unavailable_state_degrades_to_empty() {
        let json = BuiltinJsonQuery;
        let outcome = FileCollector::new(&json).collect(None, Some(&Unavailable as &dyn StateQuery));
        assert!(outcome.is_degraded());
        assert!(outcome.value().expect("value").is_empty());
    }

    #[test]
    fn no_sources_is_plain_success() {
        let json = BuiltinJsonQuery;
        let outcome = FileCollector::new(&json).collect(None, None);
        assert!(outcome.is_success());
    }
}
