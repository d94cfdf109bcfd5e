//! Object-storage seam.

use std::path::Path;

use chrono::{DateTime, Utc};
use preserve_core::{RemoteLocation, TagSet};

use crate::error::RemoteError;

/// One listed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// The four object-storage calls the pipeline needs. Implementations block.
pub trait ObjectStore {
    /// Stores the file at `body` under `location`, tagged when `tags` is set.
    fn put_object(
        &self,
        location: &RemoteLocation,
        body: &Path,
        tags: Option<&TagSet>,
    ) -> Result<(), RemoteError>;

    /// Writes the object's bytes to `target`. The parent must exist.
    fn get_object(&self, location: &RemoteLocation, target: &Path) -> Result<(), RemoteError>;

    /// Tags of an existing object; `None` when the object does not exist.
    fn get_object_tagging(&self, location: &RemoteLocation) -> Result<Option<TagSet>, RemoteError>;

    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>, RemoteError>;
}
