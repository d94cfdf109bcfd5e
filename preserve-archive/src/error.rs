//! Error types for preserve-archive.

use std::path::PathBuf;

use preserve_core::PreserveError;
use thiserror::Error;

/// All errors that can arise from archive operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive file does not exist.
    #[error("archive not found: {0}")]
    NotFound(PathBuf),

    /// Filesystem or codec failure while reading or writing an archive.
    #[error("archive io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<ArchiveError> for PreserveError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::NotFound(path) => PreserveError::NotFound(path.display().to_string()),
            ArchiveError::Io { path, source } => PreserveError::Io { path, source },
        }
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ArchiveError {
    ArchiveError::Io {
        path: path.into(),
        source,
    }
}
