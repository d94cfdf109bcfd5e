//! # preserve-pipeline
//!
//! The [`Orchestrator`] composes file collection, archiving and remote sync
//! into `push`, `pull`, `list` and `clean`, and writes the sourceable handoff
//! file after a push.

pub mod clean;
pub mod digest;
pub mod error;
pub mod handoff;
pub mod pipeline;

pub use clean::CleanReport;
pub use error::PipelineError;
pub use handoff::Handoff;
pub use pipeline::{
    ListReport, Orchestrator, PullReport, PushReport, RemoteListing, Stage, StageTrail,
    DEFAULT_ARCHIVE_NAME,
};
