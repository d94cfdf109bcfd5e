//! Error types for preserve-collector.

use std::path::PathBuf;

use preserve_core::PreserveError;
use thiserror::Error;

/// All errors that can arise while gathering candidate paths.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest exists but is not a usable JSON document.
    #[error("failed to parse manifest at {path}: {message}")]
    MalformedManifest { path: PathBuf, message: String },

    /// The state export could not be interpreted.
    #[error("failed to parse infra-state export: {0}")]
    MalformedState(String),

    /// The state query ran but did not succeed.
    #[error("state query '{tool}' failed: {message}")]
    StateQuery { tool: String, message: String },

    /// A required binary could not be executed.
    #[error("required tool '{tool}' is unavailable: {reason}")]
    ToolMissing { tool: String, reason: String },
}

impl From<CollectError> for PreserveError {
    fn from(err: CollectError) -> Self {
        match err {
            CollectError::ToolMissing { tool, reason } => PreserveError::ToolMissing { tool, reason },
            CollectError::StateQuery { tool, message } => PreserveError::ToolMissing {
                tool,
                reason: message,
            },
            CollectError::Io { path, source } => PreserveError::Io { path, source },
            malformed @ (CollectError::MalformedManifest { .. } | CollectError::MalformedState(_)) => {
                PreserveError::InvalidInput(malformed.to_string())
            }
        }
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CollectError {
    CollectError::Io {
        path: path.into(),
        source,
    }
}
