//! # preserve-remote
//!
//! Remote-location derivation, tag handling and archive transfer through an
//! [`ObjectStore`]. [`S3ObjectStore`] talks to S3 (or an S3-compatible
//! endpoint); [`MemoryObjectStore`] keeps everything in process.

pub mod error;
pub mod location;
pub mod memory;
pub mod s3;
pub mod store;
pub mod sync;
pub mod tags;

pub use error::RemoteError;
pub use location::{deployment_id, derive_from_plan, resolve_remote_location};
pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;
pub use store::{ObjectStore, ObjectSummary};
pub use sync::RemoteSync;
pub use tags::synthesize_tags;
