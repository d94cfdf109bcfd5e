//! Error types for preserve-pipeline.

use std::path::PathBuf;

use preserve_core::PreserveError;
use thiserror::Error;

/// Errors from the pipeline's own file handling (handoff file, digests,
/// cleanup). Component errors arrive already converted to [`PreserveError`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<PipelineError> for PreserveError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Io { path, source } => PreserveError::Io { path, source },
        }
    }
}

/// Convenience constructor for [`PipelineError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> PipelineError {
    PipelineError::Io {
        path: path.into(),
        source,
    }
}
