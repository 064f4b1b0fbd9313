use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client as S3Client;

use crate::error::StoreError;

/// Blob store for task attachments, one object per task id.
///
/// The public object URL is deterministic and stored on the task record;
/// the signed PUT URL is a separate, short-lived capability and is never
/// persisted.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Deterministic public URL of the object named by the task id.
    fn object_url(&self, task_id: &str) -> String;

    /// Presigned write-only URL for the object, valid for `expires_in`.
    async fn sign_put_url(&self, task_id: &str, expires_in: Duration)
        -> Result<String, StoreError>;

    /// Best-effort removal; a missing object is not an error.
    async fn delete_object(&self, task_id: &str) -> Result<(), StoreError>;
}

/// S3-backed attachment store over a single bucket.
#[derive(Clone)]
pub struct S3AttachmentStore {
    client: S3Client,
    bucket_name: String,
}

impl std::fmt::Debug for S3AttachmentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3AttachmentStore")
            .field("bucket_name", &self.bucket_name)
            .finish()
    }
}

impl S3AttachmentStore {
    /// Build a client by inheriting from the shared `SdkConfig`. The
    /// endpoint override switches to path-style addressing so local
    /// stacks (e.g. MinIO) resolve the bucket.
    pub fn new(
        sdk_config: &aws_config::SdkConfig,
        bucket_name: String,
        endpoint: Option<String>,
    ) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(sdk_config);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        let client = S3Client::from_conf(builder.build());

        Self {
            client,
            bucket_name,
        }
    }

    /// Create from a pre-built client (for testing)
    pub fn from_client(client: S3Client, bucket_name: String) -> Self {
        Self {
            client,
            bucket_name,
        }
    }
}

#[async_trait]
impl AttachmentStore for S3AttachmentStore {
    fn object_url(&self, task_id: &str) -> String {
        format!("https://{}.s3.amazonaws.com/{}", self.bucket_name, task_id)
    }

    async fn sign_put_url(
        &self,
        task_id: &str,
        expires_in: Duration,
    ) -> Result<String, StoreError> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StoreError::Internal(format!("presign config error: {}", e)))?;

        let request = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(task_id)
            .presigned(presigning)
            .await
            .map_err(|e| StoreError::Internal(format!("S3 presign error: {}", e)))?;

        Ok(request.uri().to_string())
    }

    async fn delete_object(&self, task_id: &str) -> Result<(), StoreError> {
        // S3 DeleteObject succeeds for missing keys, which matches the
        // best-effort contract here
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(task_id)
            .send()
            .await
            .map_err(|e| StoreError::Internal(format!("S3 delete_object error: {}", e)))?;

        Ok(())
    }
}

/// In-process attachment store; records the ids it signed and deleted so
/// orchestration tests can assert on blob-call behavior.
pub struct MemoryAttachmentStore {
    bucket_name: String,
    signed: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
}

impl MemoryAttachmentStore {
    pub fn new(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            signed: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn signed_ids(&self) -> Vec<String> {
        self.signed.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.deleted.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn lock(list: &Mutex<Vec<String>>) -> Result<MutexGuard<'_, Vec<String>>, StoreError> {
        list.lock()
            .map_err(|_| StoreError::Internal("attachment store lock poisoned".to_string()))
    }
}

#[async_trait]
impl AttachmentStore for MemoryAttachmentStore {
    fn object_url(&self, task_id: &str) -> String {
        format!("https://{}.s3.amazonaws.com/{}", self.bucket_name, task_id)
    }

    async fn sign_put_url(
        &self,
        task_id: &str,
        expires_in: Duration,
    ) -> Result<String, StoreError> {
        Self::lock(&self.signed)?.push(task_id.to_string());
        Ok(format!(
            "{}?X-Amz-Expires={}&X-Amz-Signature=local",
            self.object_url(task_id),
            expires_in.as_secs()
        ))
    }

    async fn delete_object(&self, task_id: &str) -> Result<(), StoreError> {
        Self::lock(&self.deleted)?.push(task_id.to_string());
        Ok(())
    }
}
