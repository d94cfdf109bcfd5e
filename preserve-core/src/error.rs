//! Error types for preserve-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building a [`crate::PreserveConfig`] or resolving a
/// remote location from it.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure while reading a config file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Neither an explicit location nor a plan identifier was configured.
    #[error("no remote location configured; set an explicit location or a plan identifier")]
    MissingLocation,

    /// A location string could not be split into bucket and key.
    #[error("invalid remote location '{0}': expected [s3://]<bucket>/<key>")]
    InvalidLocation(String),
}

/// Coarse classification used to decide fatal vs. recoverable handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    ToolMissing,
    NotFound,
    InvalidInput,
    TransferFailure,
    Io,
}

/// The pipeline-wide error taxonomy.
///
/// Component crates keep their own `thiserror` enums and convert into this
/// type at the point where an [`crate::Outcome`] turns fatal.
#[derive(Debug, Error)]
pub enum PreserveError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A required external binary is absent.
    #[error("required tool '{tool}' is unavailable: {reason}")]
    ToolMissing { tool: String, reason: String },

    /// Archive or remote object absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// A manifest or state document that could not be interpreted.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// I/O error while talking to object storage.
    #[error("transfer failed: {0}")]
    TransferFailure(String),

    /// Local filesystem failure (disk full, permission denied, ...).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PreserveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PreserveError::Config(_) => ErrorKind::Config,
            PreserveError::ToolMissing { .. } => ErrorKind::ToolMissing,
            PreserveError::NotFound(_) => ErrorKind::NotFound,
            PreserveError::InvalidInput(_) => ErrorKind::InvalidInput,
            PreserveError::TransferFailure(_) => ErrorKind::TransferFailure,
            PreserveError::Io { .. } => ErrorKind::Io,
        }
    }
}

/// Convenience constructor for [`PreserveError::Io`].
pub fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> PreserveError {
    PreserveError::Io {
        path: path.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            PreserveError::from(ConfigError::MissingLocation).kind(),
            ErrorKind::Config
        );
        let missing = PreserveError::ToolMissing {
            tool: "jq".into(),
            reason: "not on PATH".into(),
        };
        assert_eq!(missing.kind(), ErrorKind::ToolMissing);
        assert!(missing.to_string().contains("'jq'"));
    }

    #[test]
    fn io_err_keeps_path_in_message() {
        let err = io_err(
            "/tmp/out.tar.gz",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/out.tar.gz"));
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
