//! Archive construction.
//!
//! Missing paths never block creation: they are recorded in the
//! [`BuildSummary`] and the outcome is degraded. Only I/O failures while
//! writing the archive itself are fatal.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};

use preserve_core::{Degradation, Outcome};

use crate::compression::Compression;
use crate::error::{io_err, ArchiveError};

/// Result of a [`ArchiveBuilder::build`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    /// Where the archive was written (after any suffix adjustment).
    pub archive_path: PathBuf,
    pub existing_count: usize,
    pub missing_count: usize,
    /// Paths that did not exist at build time, in input order.
    pub missing: Vec<String>,
}

/// Builds archives from paths relative to `base`.
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    base: PathBuf,
}

impl ArchiveBuilder {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Archives every existing entry of `paths` into `destination`.
    ///
    /// Directories are added recursively. Absolute paths are read from their
    /// absolute location and stored with the root stripped.
    pub fn build(&self, paths: &[String], destination: &Path) -> Outcome<BuildSummary> {
        match self.write_archive(paths, destination) {
            Ok(summary) => {
                info!(
                    "archived {} path(s) into {} ({} missing)",
                    summary.existing_count,
                    summary.archive_path.display(),
                    summary.missing_count
                );
                if summary.missing.is_empty() {
                    Outcome::success(summary)
                } else {
                    let missing = summary.missing.clone();
                    Outcome::degraded(summary, Degradation::MissingFiles { paths: missing })
                }
            }
            Err(err) => Outcome::fatal(err),
        }
    }

    fn write_archive(&self, paths: &[String], destination: &Path) -> Result<BuildSummary, ArchiveError> {
        let (archive_path, compression) = Compression::resolve_destination(destination);
        let parent = match archive_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| io_err(&parent, e))?;

        // Written beside the destination and renamed into place on success.
        let staged = tempfile::Builder::new()
            .prefix(".preserve-")
            .suffix(".partial")
            .tempfile_in(&parent)
            .map_err(|e| io_err(&parent, e))?;

        let mut tar = tar::Builder::new(compression.encoder(staged.as_file()));
        let mut existing = Vec::new();
        let mut missing = Vec::new();

        for path in paths {
            let source = self.source_path(path);
            if !source.exists() {
                warn!("{path} does not exist; skipping");
                missing.push(path.clone());
                continue;
            }
            let name = entry_name(path);
            debug!("adding {} as {}", source.display(), name.display());
            let added = if source.is_dir() {
                tar.append_dir_all(&name, &source)
            } else {
                tar.append_path_with_name(&source, &name)
            };
            added.map_err(|e| io_err(&source, e))?;
            existing.push(path.clone());
        }

        let encoder = tar.into_inner().map_err(|e| io_err(&archive_path, e))?;
        encoder.finish().map_err(|e| io_err(&archive_path, e))?;
        staged
            .persist(&archive_path)
            .map_err(|e| io_err(&archive_path, e.error))?;

        Ok(BuildSummary {
            archive_path,
            existing_count: existing.len(),
            missing_count: missing.len(),
            missing,
        })
    }

    fn source_path(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base.join(p)
        }
    }
}

/// Stored name for a collected path: the path itself, minus any root.
fn entry_name(path: &str) -> PathBuf {
    Path::new(path)
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_name_strips_root() {
        assert_eq!(entry_name("/home/ci/.kube/config"), PathBuf::from("home/ci/.kube/config"));
        assert_eq!(entry_name("out/a.txt"), PathBuf::from("out/a.txt"));
    }
}
