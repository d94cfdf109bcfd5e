//! Upload, download and tag handling over an [`ObjectStore`].

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use preserve_archive::{Compression, ExtractOptions, ExtractSummary};
use preserve_core::{Degradation, DeploymentContext, Outcome, PreserveError, RemoteLocation, TagSet};

use crate::error::{io_err, RemoteError};
use crate::store::{ObjectStore, ObjectSummary};
use crate::tags::synthesize_tags;

/// Moves archives between the local filesystem and object storage.
pub struct RemoteSync<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> RemoteSync<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    /// Tags already on the object at `location` are reused verbatim. When
    /// there are none, or the lookup fails, tags are synthesized from
    /// `context` and the plan identifier.
    pub fn resolve_tag_set(
        &self,
        location: &RemoteLocation,
        context: &DeploymentContext,
        plan_identifier: Option<&str>,
    ) -> TagSet {
        match self.store.get_object_tagging(location) {
            Ok(Some(existing)) if !existing.is_empty() => {
                info!("reusing {} existing tag(s) on {location}", existing.pairs().len());
                existing
            }
            Ok(_) => {
                debug!("no tags on {location}; synthesizing");
                synthesize_tags(context, plan_identifier)
            }
            Err(err) => {
                warn!("tag lookup failed, synthesizing: {err}");
                synthesize_tags(context, plan_identifier)
            }
        }
    }

    /// Tagged put first; on failure a single untagged retry. Only both
    /// failing is fatal.
    pub fn upload(&self, archive: &Path, location: &RemoteLocation, tags: &TagSet) -> Outcome<()> {
        if tags.is_empty() {
            return match self.store.put_object(location, archive, None) {
                Ok(()) => Outcome::success(()),
                Err(err) => Outcome::fatal(PreserveError::TransferFailure(err.to_string())),
            };
        }

        let tagged_err = match self.store.put_object(location, archive, Some(tags)) {
            Ok(()) => {
                info!("uploaded {} to {location} with tags", archive.display());
                return Outcome::success(());
            }
            Err(err) => err,
        };
        warn!("tagged upload failed, retrying without tags: {tagged_err}");

        match self.store.put_object(location, archive, None) {
            Ok(()) => Outcome::degraded(
                (),
                Degradation::UntaggedFallback {
                    reason: tagged_err.to_string(),
                },
            ),
            Err(err) => Outcome::fatal(PreserveError::TransferFailure(format!(
                "tagged upload: {tagged_err}; untagged retry: {err}"
            ))),
        }
    }

    /// Fetches `location` into `target`, creating parent directories.
    pub fn download(&self, location: &RemoteLocation, target: &Path) -> Result<(), RemoteError> {
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        self.store.get_object(location, target)?;
        info!("downloaded {location} to {}", target.display());
        Ok(())
    }

    pub fn extract(&self, archive: &Path, options: &ExtractOptions) -> Outcome<ExtractSummary> {
        preserve_archive::extract(archive, options)
    }

    /// Objects under `bucket/prefix` whose names carry an archive suffix.
    pub fn list_archives(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>, RemoteError> {
        let mut archives: Vec<ObjectSummary> = self
            .store
            .list_objects(bucket, prefix)?
            .into_iter()
            .filter(|o| Compression::from_suffix(Path::new(&o.key)).is_some())
            .collect();
        archives.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(archives)
    }
}
