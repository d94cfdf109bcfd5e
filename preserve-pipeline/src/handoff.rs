//! Sourceable handoff file.
//!
//! Written after a successful push so later steps of the same job can
//! `source` it:
//!
//! ```text
//! export PRESERVED_FILES_LOCATION='s3://bucket/key'
//! export PRESERVED_FILES_SHA256='…'
//! ```
//!
//! The variable names match the CLI's environment bindings, so sourcing the
//! file is enough for a later `preserve pull`. Writes use `.tmp` + rename.

use std::path::{Path, PathBuf};

use chrono::Utc;

use preserve_core::RemoteLocation;

use crate::error::{io_err, PipelineError};

pub const LOCATION_VAR: &str = "PRESERVED_FILES_LOCATION";
pub const DIGEST_VAR: &str = "PRESERVED_FILES_SHA256";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    pub location: RemoteLocation,
    pub sha256: String,
}

impl Handoff {
    pub fn render(&self) -> String {
        format!(
            "# generated by preserve at {}\nexport {LOCATION_VAR}={}\nexport {DIGEST_VAR}={}\n",
            Utc::now().to_rfc3339(),
            shell_quote(&self.location.uri()),
            shell_quote(&self.sha256),
        )
    }
}

/// Single-quotes `value` for POSIX shells.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Writes `handoff` to `path` atomically, creating parent directories.
pub fn write_at(path: &Path, handoff: &Handoff) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    std::fs::write(&tmp, handoff.render()).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    tracing::info!("wrote handoff file {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn handoff() -> Handoff {
        Handoff {
            location: RemoteLocation::new("bucket", "path/id_preserved_files.tar.gz"),
            sha256: "deadbeef".into(),
        }
    }

    #[test]
    fn render_exports_quoted_location() {
        let text = handoff().render();
        assert!(text.contains(
            "export PRESERVED_FILES_LOCATION='s3://bucket/path/id_preserved_files.tar.gz'\n"
        ));
        assert!(text.contains("export PRESERVED_FILES_SHA256='deadbeef'\n"));
    }

    #[test]
    fn quotes_are_escaped() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn write_at_replaces_and_leaves_no_tmp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/preserve.env");
        write_at(&path, &handoff()).unwrap();
        write_at(&path, &handoff()).unwrap();
        assert!(path.is_file());
        assert!(!dir.path().join("out/preserve.env.tmp").exists());
    }
}
