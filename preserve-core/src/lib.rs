//! Preserve core library: domain types, configuration, outcome and errors.
//!
//! Public API surface:
//! - [`types`]: manifest, state resources, path sets, remote locations, tags
//! - [`config`]: [`PreserveConfig`], built once at the entry point
//! - [`outcome`]: three-way [`Outcome`] threaded through every operation
//! - [`error`]: [`PreserveError`] taxonomy and [`ConfigError`]

pub mod config;
pub mod error;
pub mod outcome;
pub mod types;

pub use config::{DeploymentContext, PreserveConfig};
pub use error::{ConfigError, ErrorKind, PreserveError};
pub use outcome::{Degradation, Outcome};
pub use types::{
    CollectedPathSet, FileAttributes, Manifest, RemoteLocation, StateResource, TagSet,
};
