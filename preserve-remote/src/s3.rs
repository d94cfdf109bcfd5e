//! S3-backed [`ObjectStore`].
//!
//! The SDK is async; the pipeline is not. The store owns a current-thread
//! tokio runtime and blocks on every call.

use std::path::Path;

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use chrono::DateTime;
use tokio::io::AsyncWriteExt;
use tokio::runtime::Runtime;
use tracing::debug;

use preserve_core::{RemoteLocation, TagSet};

use crate::error::{io_err, transfer, RemoteError};
use crate::store::{ObjectStore, ObjectSummary};

const NO_SUCH_KEY: &str = "NoSuchKey";

pub struct S3ObjectStore {
    client: S3Client,
    runtime: Runtime,
}

impl S3ObjectStore {
    /// Builds a client from the ambient credential chain. `endpoint_override`
    /// switches to path-style addressing (MinIO, localstack).
    pub fn new(region: &str, endpoint_override: Option<&str>) -> Result<Self, RemoteError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RemoteError::Runtime(e.to_string()))?;

        let shared = runtime.block_on(
            aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(region.to_string()))
                .load(),
        );
        let mut config_builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = endpoint_override {
            config_builder = config_builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self {
            client: S3Client::from_conf(config_builder.build()),
            runtime,
        })
    }
}

impl ObjectStore for S3ObjectStore {
    fn put_object(
        &self,
        location: &RemoteLocation,
        body: &Path,
        tags: Option<&TagSet>,
    ) -> Result<(), RemoteError> {
        self.runtime.block_on(async {
            let stream = ByteStream::from_path(body)
                .await
                .map_err(|e| transfer(location, format!("cannot read {}: {e}", body.display())))?;
            self.client
                .put_object()
                .bucket(&location.bucket)
                .key(&location.key)
                .body(stream)
                .set_tagging(tags.map(TagSet::to_query_string))
                .send()
                .await
                .map_err(|e| transfer(location, format!("upload failed: {e}")))?;
            debug!("uploaded {} to {location}", body.display());
            Ok(())
        })
    }

    fn get_object(&self, location: &RemoteLocation, target: &Path) -> Result<(), RemoteError> {
        let copied = self.runtime.block_on(async {
            let resp = self
                .client
                .get_object()
                .bucket(&location.bucket)
                .key(&location.key)
                .send()
                .await
                .map_err(|e| {
                    let service_err = e.into_service_error();
                    if service_err.is_no_such_key() {
                        RemoteError::NotFound(location.uri())
                    } else {
                        transfer(location, format!("download failed: {service_err}"))
                    }
                })?;

            let mut file = tokio::fs::File::create(target)
                .await
                .map_err(|e| io_err(target, e))?;
            let body = resp.body.into_async_read();
            tokio::pin!(body);
            let copied = match tokio::io::copy_buf(&mut body, &mut file).await {
                Ok(copied) => file.flush().await.map(|()| copied).map_err(|e| io_err(target, e)),
                Err(e) => Err(transfer(location, format!("failed to read body: {e}"))),
            };
            if copied.is_err() {
                drop(file);
                let _ = tokio::fs::remove_file(target).await;
            }
            copied
        })?;

        debug!("downloaded {copied} bytes from {location}");
        Ok(())
    }

    fn get_object_tagging(&self, location: &RemoteLocation) -> Result<Option<TagSet>, RemoteError> {
        self.runtime.block_on(async {
            let resp = self
                .client
                .get_object_tagging()
                .bucket(&location.bucket)
                .key(&location.key)
                .send()
                .await;
            match resp {
                Ok(resp) => Ok(Some(TagSet::from_pairs(
                    resp.tag_set().iter().map(|t| (t.key(), t.value())),
                ))),
                Err(e) => {
                    let service_err = e.into_service_error();
                    if service_err.code() == Some(NO_SUCH_KEY) {
                        Ok(None)
                    } else {
                        Err(transfer(location, format!("tag lookup failed: {service_err}")))
                    }
                }
            }
        })
    }

    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>, RemoteError> {
        self.runtime.block_on(async {
            let mut objects = Vec::new();
            let mut token: Option<String> = None;
            loop {
                let resp = self
                    .client
                    .list_objects_v2()
                    .bucket(bucket)
                    .prefix(prefix)
                    .set_continuation_token(token.take())
                    .send()
                    .await
                    .map_err(|e| transfer(format!("s3://{bucket}/{prefix}"), format!("list failed: {e}")))?;

                objects.extend(resp.contents().iter().filter_map(|obj| {
                    Some(ObjectSummary {
                        key: obj.key()?.to_string(),
                        size: obj.size().and_then(|s| u64::try_from(s).ok()).unwrap_or(0),
                        last_modified: obj
                            .last_modified()
                            .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
                    })
                }));

                match resp.next_continuation_token() {
                    Some(next) if resp.is_truncated() == Some(true) => token = Some(next.to_string()),
                    _ => break,
                }
            }
            Ok(objects)
        })
    }
}
