use std::sync::Arc;
use std::time::Duration;

use taskbox_atoms::attachments::{AttachmentStore, S3AttachmentStore};
use taskbox_atoms::tasks::{
    CreateTaskPayload, DynamoTaskStore, Task, TaskStore, UpdateTaskPayload, UploadGrant,
};

use crate::auth::{HttpKeySetSource, TokenVerifier};
use crate::config::Config;
use crate::error::ServiceError;

/// Orchestrates the verifier, the record store, and the blob store.
///
/// Holds wiring only; every operation resolves the tenant from the
/// bearer header first and hands the adapters that tenant id. Identity
/// failures short-circuit before any store access.
pub struct TaskService {
    verifier: TokenVerifier,
    store: Arc<dyn TaskStore>,
    attachments: Arc<dyn AttachmentStore>,
    upload_url_expiry: Duration,
}

impl TaskService {
    pub fn new(
        verifier: TokenVerifier,
        store: Arc<dyn TaskStore>,
        attachments: Arc<dyn AttachmentStore>,
        upload_url_expiry: Duration,
    ) -> Self {
        Self {
            verifier,
            store,
            attachments,
            upload_url_expiry,
        }
    }

    /// Production wiring: one shared AWS config, DynamoDB-backed records,
    /// S3-backed attachments, HTTP-fetched signing keys.
    pub async fn from_config(config: Config) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        let endpoint = config.endpoint_url;
        let store = DynamoTaskStore::new(&sdk_config, config.table_name, endpoint.clone());
        let attachments = S3AttachmentStore::new(&sdk_config, config.bucket_name, endpoint);
        let verifier = TokenVerifier::new(Arc::new(HttpKeySetSource::new(config.jwks_url)));

        Self::new(
            verifier,
            Arc::new(store),
            Arc::new(attachments),
            Duration::from_secs(config.signed_url_expiration),
        )
    }

    pub async fn list_tasks(&self, bearer_header: Option<&str>) -> Result<Vec<Task>, ServiceError> {
        let claim = self.verifier.verify(bearer_header).await?;
        Ok(self.store.list(&claim.user_id).await?)
    }

    pub async fn create_task(
        &self,
        bearer_header: Option<&str>,
        payload: CreateTaskPayload,
    ) -> Result<Task, ServiceError> {
        let claim = self.verifier.verify(bearer_header).await?;

        let task = Task {
            user_id: claim.user_id,
            task_id: uuid::Uuid::new_v4().to_string(),
            name: payload.name,
            due_date: payload.due_date,
            done: false,
            created_at: chrono::Utc::now().to_rfc3339(),
            attachment_url: String::new(),
        };

        tracing::info!(user_id = %task.user_id, task_id = %task.task_id, "creating task");
        self.store.create(&task).await?;

        Ok(task)
    }

    pub async fn update_task(
        &self,
        bearer_header: Option<&str>,
        task_id: &str,
        payload: UpdateTaskPayload,
    ) -> Result<(), ServiceError> {
        let claim = self.verifier.verify(bearer_header).await?;
        self.store.update(&claim.user_id, task_id, &payload).await?;
        Ok(())
    }

    pub async fn delete_task(
        &self,
        bearer_header: Option<&str>,
        task_id: &str,
    ) -> Result<(), ServiceError> {
        let claim = self.verifier.verify(bearer_header).await?;
        self.store.delete(&claim.user_id, task_id).await?;

        // Record removal succeeded; blob removal is best-effort. A failure
        // here leaves an orphaned object behind, which this design accepts.
        if let Err(e) = self.attachments.delete_object(task_id).await {
            tracing::warn!(task_id = %task_id, error = %e, "attachment cleanup failed after delete");
        }

        Ok(())
    }

    /// Stores the public object URL on the record, then hands back a
    /// separate short-lived write URL. The two URLs are distinct on
    /// purpose: the stored one identifies the object, the returned one
    /// grants the upload.
    pub async fn generate_upload_url(
        &self,
        bearer_header: Option<&str>,
        task_id: &str,
    ) -> Result<UploadGrant, ServiceError> {
        let claim = self.verifier.verify(bearer_header).await?;

        let object_url = self.attachments.object_url(task_id);
        self.store
            .set_attachment_url(&claim.user_id, task_id, &object_url)
            .await?;

        let upload_url = self
            .attachments
            .sign_put_url(task_id, self.upload_url_expiry)
            .await?;

        Ok(UploadGrant {
            upload_url,
            expires_in: self.upload_url_expiry.as_secs(),
        })
    }
}
