//! Local cleanup: manifest-listed files and archives in a directory.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use preserve_archive::Compression;

use crate::error::{io_err, PipelineError};

/// What a cleanup pass did. Nothing here is an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub removed: Vec<String>,
    pub missing: Vec<String>,
    /// `(path, reason)` for files that exist but could not be removed.
    pub failed: Vec<(String, String)>,
}

impl CleanReport {
    pub fn merge(&mut self, other: CleanReport) {
        self.removed.extend(other.removed);
        self.missing.extend(other.missing);
        self.failed.extend(other.failed);
    }
}

/// Removes each of `paths` (relative to `base`). Directories are refused.
pub fn remove_files(base: &Path, paths: &[String]) -> CleanReport {
    let mut report = CleanReport::default();
    for path in paths {
        let target = base.join(path);
        match fs::symlink_metadata(&target) {
            Err(_) => {
                debug!("{path} not found, skipping");
                report.missing.push(path.clone());
            }
            Ok(meta) if meta.is_dir() => {
                report.failed.push((path.clone(), "is a directory".to_string()));
            }
            Ok(_) => match fs::remove_file(&target) {
                Ok(()) => report.removed.push(path.clone()),
                Err(e) => {
                    warn!("could not delete {path}: {e}");
                    report.failed.push((path.clone(), e.to_string()));
                }
            },
        }
    }
    report
}

/// Removes every file directly inside `dir` whose name has an archive suffix.
pub fn remove_archives(dir: &Path) -> Result<CleanReport, PipelineError> {
    let mut report = CleanReport::default();
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        if path.is_file() && Compression::from_suffix(&path).is_some() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    for name in names {
        match fs::remove_file(dir.join(&name)) {
            Ok(()) => report.removed.push(name),
            Err(e) => {
                warn!("could not delete {name}: {e}");
                report.failed.push((name, e.to_string()));
            }
        }
    }
    Ok(report)
}
