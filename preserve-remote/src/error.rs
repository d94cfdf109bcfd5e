//! Error types for preserve-remote.

use std::path::PathBuf;

use preserve_core::PreserveError;
use thiserror::Error;

/// All errors that can arise while talking to object storage.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The object does not exist.
    #[error("remote object not found: {0}")]
    NotFound(String),

    /// The store rejected or failed the request.
    #[error("transfer failed for {location}: {message}")]
    Transfer { location: String, message: String },

    /// Local file read/write around a transfer.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The async runtime driving the client could not be started.
    #[error("failed to start storage runtime: {0}")]
    Runtime(String),
}

impl From<RemoteError> for PreserveError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotFound(location) => PreserveError::NotFound(location),
            RemoteError::Io { path, source } => PreserveError::Io { path, source },
            other => PreserveError::TransferFailure(other.to_string()),
        }
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RemoteError {
    RemoteError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn transfer(location: impl ToString, message: impl ToString) -> RemoteError {
    RemoteError::Transfer {
        location: location.to_string(),
        message: message.to_string(),
    }
}
