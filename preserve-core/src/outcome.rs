//! Three-way result type shared by every pipeline operation.
//!
//! A preservation run must never block the plan/apply workflow on a
//! best-effort condition, but it must not lose the detail either. Each
//! operation returns [`Outcome`]: `Success`, `Degraded` (usable value plus the
//! reasons it is incomplete) or `Fatal`. Composition goes through
//! [`Outcome::record`], which moves degradation reasons into the caller's sink
//! and turns `Fatal` into an `Err` so `?` works.

use std::fmt;
use std::path::PathBuf;

use crate::error::PreserveError;

/// A non-fatal condition encountered during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Degradation {
    /// The manifest exists but could not be parsed.
    ManifestMalformed { path: PathBuf, message: String },
    /// The infra-state query tool is missing or the query failed.
    StateUnavailable { reason: String },
    /// Collected paths that did not exist when the archive was built.
    MissingFiles { paths: Vec<String> },
    /// No explicit location or plan identifier was available.
    NoRemoteLocation,
    /// The remote object does not exist.
    RemoteObjectMissing { location: String },
    /// Upload or download failed in a context where that is recoverable.
    TransferFailed { reason: String },
    /// The tagged write failed and an untagged write was used instead.
    UntaggedFallback { reason: String },
    /// The downloaded archive digest does not match the recorded one.
    DigestMismatch { expected: String, actual: String },
    /// An archive entry was refused during extraction.
    EntrySkipped { entry: String, reason: String },
    /// Extraction stopped part-way.
    ExtractFailed { reason: String },
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::ManifestMalformed { path, message } => {
                write!(f, "manifest {} is malformed: {message}", path.display())
            }
            Degradation::StateUnavailable { reason } => {
                write!(f, "infra-state unavailable: {reason}")
            }
            Degradation::MissingFiles { paths } => {
                write!(f, "{} file(s) missing at archive time", paths.len())
            }
            Degradation::NoRemoteLocation => write!(f, "no remote location resolved"),
            Degradation::RemoteObjectMissing { location } => {
                write!(f, "remote object {location} does not exist")
            }
            Degradation::TransferFailed { reason } => write!(f, "transfer failed: {reason}"),
            Degradation::UntaggedFallback { reason } => {
                write!(f, "tagged upload failed, stored without tags: {reason}")
            }
            Degradation::DigestMismatch { expected, actual } => {
                write!(f, "archive digest mismatch: expected {expected}, got {actual}")
            }
            Degradation::EntrySkipped { entry, reason } => {
                write!(f, "skipped archive entry {entry}: {reason}")
            }
            Degradation::ExtractFailed { reason } => write!(f, "extraction failed: {reason}"),
        }
    }
}

/// Success, degraded success, or fatal failure.
#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    Degraded(T, Vec<Degradation>),
    Fatal(PreserveError),
}

impl<T> Outcome<T> {
    pub fn success(value: T) -> Self {
        Outcome::Success(value)
    }

    pub fn degraded(value: T, reason: Degradation) -> Self {
        Outcome::Degraded(value, vec![reason])
    }

    pub fn fatal(err: impl Into<PreserveError>) -> Self {
        Outcome::Fatal(err.into())
    }

    /// `Success` when `reasons` is empty, `Degraded` otherwise.
    pub fn from_parts(value: T, reasons: Vec<Degradation>) -> Self {
        if reasons.is_empty() {
            Outcome::Success(value)
        } else {
            Outcome::Degraded(value, reasons)
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded(..))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Outcome::Fatal(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Success(v) | Outcome::Degraded(v, _) => Some(v),
            Outcome::Fatal(_) => None,
        }
    }

    pub fn degradations(&self) -> &[Degradation] {
        match self {
            Outcome::Degraded(_, reasons) => reasons,
            _ => &[],
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(v) => Outcome::Success(f(v)),
            Outcome::Degraded(v, reasons) => Outcome::Degraded(f(v), reasons),
            Outcome::Fatal(e) => Outcome::Fatal(e),
        }
    }

    /// Adds a reason; a `Success` becomes `Degraded`, `Fatal` is unchanged.
    pub fn with_degradation(self, reason: Degradation) -> Self {
        match self {
            Outcome::Success(v) => Outcome::Degraded(v, vec![reason]),
            Outcome::Degraded(v, mut reasons) => {
                reasons.push(reason);
                Outcome::Degraded(v, reasons)
            }
            fatal @ Outcome::Fatal(_) => fatal,
        }
    }

    /// Downgrades a `Fatal` outcome to `Degraded` using `f`.
    pub fn recover(self, f: impl FnOnce(PreserveError) -> (T, Degradation)) -> Self {
        match self {
            Outcome::Fatal(e) => {
                let (value, reason) = f(e);
                Outcome::Degraded(value, vec![reason])
            }
            other => other,
        }
    }

    pub fn into_result(self) -> Result<(T, Vec<Degradation>), PreserveError> {
        match self {
            Outcome::Success(v) => Ok((v, Vec::new())),
            Outcome::Degraded(v, reasons) => Ok((v, reasons)),
            Outcome::Fatal(e) => Err(e),
        }
    }

    /// Moves degradation reasons into `sink` and returns the value.
    pub fn record(self, sink: &mut Vec<Degradation>) -> Result<T, PreserveError> {
        let (value, reasons) = self.into_result()?;
        sink.extend(reasons);
        Ok(value)
    }
}

impl<T, E: Into<PreserveError>> From<Result<T, E>> for Outcome<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => Outcome::Success(v),
            Err(e) => Outcome::Fatal(e.into()),
        }
    }
}
