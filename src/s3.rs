//! Object store backend on any S3-compatible endpoint (path-style addressing).

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use robin_core::contract::{ObjectStore, ObjectVersion};
use robin_core::{BackendKind, HandlerError, HandlerResult};
use tracing::{info, warn};

pub struct S3Store {
    client: Client,
    bucket: String,
}

fn request_error(context: &str, e: impl std::error::Error) -> HandlerError {
    HandlerError::Request {
        kind: BackendKind::ObjectStore,
        message: format!("{context}: {}", DisplayErrorContext(&e)),
    }
}

impl S3Store {
    /// Credentials come from the shared-config `profile`; requests go to `endpoint`.
    pub async fn connect(bucket: &str, endpoint: &str, region: &str, profile: &str) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .profile_name(profile)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();

        info!(bucket, endpoint, region, profile, "S3 client initialized");
        S3Store {
            client: Client::from_conf(s3_config),
            bucket: bucket.to_string(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_keys(&self) -> HandlerResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| request_error("failed to list objects", e))?;

            keys.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );

            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string())
                }
                _ => break,
            }
        }
        Ok(keys)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_object_versions(&self) -> HandlerResult<Vec<ObjectVersion>> {
        let keys = self.list_keys().await?;
        let mut objects = Vec::with_capacity(keys.len());
        for key in keys {
            match self.object_version(&key).await {
                Ok(version_id) => objects.push(ObjectVersion { key, version_id }),
                Err(e) => warn!(key = %key, error = %e, "Failed to get version for object, skipping"),
            }
        }
        Ok(objects)
    }

    async fn object_version(&self, key: &str) -> HandlerResult<String> {
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| request_error("failed to get object metadata", e))?;

        Ok(output.version_id().unwrap_or_default().to_string())
    }
}
