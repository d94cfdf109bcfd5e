//! In-memory [`ObjectStore`] with failure injection.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::Path;

use preserve_core::{RemoteLocation, TagSet};

use crate::error::{io_err, transfer, RemoteError};
use crate::store::{ObjectStore, ObjectSummary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub tags: Option<TagSet>,
}

/// Keeps objects in a map keyed by `(bucket, key)`. Last write wins.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RefCell<BTreeMap<(String, String), StoredObject>>,
    reject_tagged_writes: Cell<bool>,
    reject_all_writes: Cell<bool>,
    fail_tag_lookup: Cell<bool>,
    puts: Cell<usize>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts carrying tags fail; untagged puts succeed.
    pub fn rejecting_tagged_writes(self) -> Self {
        self.reject_tagged_writes.set(true);
        self
    }

    /// Every put fails.
    pub fn rejecting_writes(self) -> Self {
        self.reject_all_writes.set(true);
        self
    }

    /// Tag lookups fail with a transfer error.
    pub fn failing_tag_lookup(self) -> Self {
        self.fail_tag_lookup.set(true);
        self
    }

    pub fn insert(&self, location: &RemoteLocation, body: impl Into<Vec<u8>>, tags: Option<TagSet>) {
        self.objects.borrow_mut().insert(
            key_of(location),
            StoredObject {
                body: body.into(),
                tags,
            },
        );
    }

    pub fn object(&self, location: &RemoteLocation) -> Option<StoredObject> {
        self.objects.borrow().get(&key_of(location)).cloned()
    }

    /// Number of put attempts, failed ones included.
    pub fn put_attempts(&self) -> usize {
        self.puts.get()
    }
}

fn key_of(location: &RemoteLocation) -> (String, String) {
    (location.bucket.clone(), location.key.clone())
}

impl ObjectStore for MemoryObjectStore {
    fn put_object(
        &self,
        location: &RemoteLocation,
        body: &Path,
        tags: Option<&TagSet>,
    ) -> Result<(), RemoteError> {
        self.puts.set(self.puts.get() + 1);
        if self.reject_all_writes.get() {
            return Err(transfer(location, "write rejected"));
        }
        if tags.is_some() && self.reject_tagged_writes.get() {
            return Err(transfer(location, "access denied for tagging"));
        }
        let bytes = std::fs::read(body).map_err(|e| io_err(body, e))?;
        self.insert(location, bytes, tags.cloned());
        Ok(())
    }

    fn get_object(&self, location: &RemoteLocation, target: &Path) -> Result<(), RemoteError> {
        let object = self
            .object(location)
            .ok_or_else(|| RemoteError::NotFound(location.uri()))?;
        std::fs::write(target, object.body).map_err(|e| io_err(target, e))
    }

    fn get_object_tagging(&self, location: &RemoteLocation) -> Result<Option<TagSet>, RemoteError> {
        if self.fail_tag_lookup.get() {
            return Err(transfer(location, "tag lookup denied"));
        }
        Ok(self
            .object(location)
            .map(|o| o.tags.unwrap_or_default()))
    }

    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>, RemoteError> {
        Ok(self
            .objects
            .borrow()
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .map(|((_, k), o)| ObjectSummary {
                key: k.clone(),
                size: o.body.len() as u64,
                last_modified: None,
            })
            .collect())
    }
}
