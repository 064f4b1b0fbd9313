use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;

use super::model::{Task, UpdateTaskPayload};
use crate::error::StoreError;

/// Tenant-scoped CRUD over the task table.
///
/// Every operation takes the caller-resolved tenant id; implementations
/// must never return or touch records belonging to another tenant.
/// Mutations against a missing (tenant, task) pair fail with
/// `StoreError::NotFound` without writing anything.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// All records for the tenant, store-native order.
    async fn list(&self, user_id: &str) -> Result<Vec<Task>, StoreError>;

    /// Unconditional insert; the caller has already populated id,
    /// timestamp, and defaults.
    async fn create(&self, task: &Task) -> Result<(), StoreError>;

    /// Existence-check primitive; `Ok(None)` when the record is absent.
    async fn get(&self, user_id: &str, task_id: &str) -> Result<Option<Task>, StoreError>;

    /// Overwrites name and due date; the done flag only when the payload
    /// carries one.
    async fn update(
        &self,
        user_id: &str,
        task_id: &str,
        payload: &UpdateTaskPayload,
    ) -> Result<(), StoreError>;

    async fn delete(&self, user_id: &str, task_id: &str) -> Result<(), StoreError>;

    /// Stores the public object URL for the record's attachment.
    async fn set_attachment_url(
        &self,
        user_id: &str,
        task_id: &str,
        url: &str,
    ) -> Result<(), StoreError>;
}

/// DynamoDB-backed task store.
///
/// One table, partition key `userId`, sort key `taskId`. Mutations are
/// single conditional writes (`attribute_exists(userId)`) so the
/// existence check and the write cannot race; a failed condition maps to
/// `StoreError::NotFound`.
#[derive(Clone)]
pub struct DynamoTaskStore {
    client: DynamoClient,
    table_name: String,
}

impl std::fmt::Debug for DynamoTaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoTaskStore")
            .field("table_name", &self.table_name)
            .finish()
    }
}

impl DynamoTaskStore {
    /// Build a client by inheriting from the shared `SdkConfig`, applying
    /// the endpoint override when one is configured (e.g. LocalStack).
    pub fn new(
        sdk_config: &aws_config::SdkConfig,
        table_name: String,
        endpoint: Option<String>,
    ) -> Self {
        let mut builder = aws_sdk_dynamodb::config::Builder::from(sdk_config);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        let client = DynamoClient::from_conf(builder.build());

        Self { client, table_name }
    }

    /// Create from a pre-built client (for testing)
    pub fn from_client(client: DynamoClient, table_name: String) -> Self {
        Self { client, table_name }
    }

    fn item_to_task(item: &HashMap<String, AttributeValue>) -> Task {
        Task {
            user_id: item
                .get("userId")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .unwrap_or_default(),
            task_id: item
                .get("taskId")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .unwrap_or_default(),
            name: item
                .get("name")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .unwrap_or_default(),
            due_date: item
                .get("dueDate")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .unwrap_or_default(),
            done: item
                .get("done")
                .and_then(|v| v.as_bool().ok())
                .copied()
                .unwrap_or(false),
            created_at: item
                .get("createdAt")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .unwrap_or_default(),
            attachment_url: item
                .get("attachmentUrl")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .unwrap_or_default(),
        }
    }

    /// Check if an UpdateItem error is a conditional check failure
    fn is_update_condition_failure(
        err: &aws_sdk_dynamodb::error::SdkError<
            aws_sdk_dynamodb::operation::update_item::UpdateItemError,
        >,
    ) -> bool {
        use aws_sdk_dynamodb::error::SdkError;
        use aws_sdk_dynamodb::operation::update_item::UpdateItemError;

        match err {
            SdkError::ServiceError(service_err) => {
                matches!(
                    service_err.err(),
                    UpdateItemError::ConditionalCheckFailedException(_)
                )
            }
            _ => false,
        }
    }

    /// Check if a DeleteItem error is a conditional check failure
    fn is_delete_condition_failure(
        err: &aws_sdk_dynamodb::error::SdkError<
            aws_sdk_dynamodb::operation::delete_item::DeleteItemError,
        >,
    ) -> bool {
        use aws_sdk_dynamodb::error::SdkError;
        use aws_sdk_dynamodb::operation::delete_item::DeleteItemError;

        match err {
            SdkError::ServiceError(service_err) => {
                matches!(
                    service_err.err(),
                    DeleteItemError::ConditionalCheckFailedException(_)
                )
            }
            _ => false,
        }
    }
}

#[async_trait]
impl TaskStore for DynamoTaskStore {
    async fn list(&self, user_id: &str) -> Result<Vec<Task>, StoreError> {
        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("userId = :userId")
            .expression_attribute_values(":userId", AttributeValue::S(user_id.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::Internal(format!("DynamoDB query error: {}", e)))?;

        Ok(result.items().iter().map(Self::item_to_task).collect())
    }

    async fn create(&self, task: &Task) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .item("userId", AttributeValue::S(task.user_id.clone()))
            .item("taskId", AttributeValue::S(task.task_id.clone()))
            .item("name", AttributeValue::S(task.name.clone()))
            .item("dueDate", AttributeValue::S(task.due_date.clone()))
            .item("done", AttributeValue::Bool(task.done))
            .item("createdAt", AttributeValue::S(task.created_at.clone()))
            .item("attachmentUrl", AttributeValue::S(task.attachment_url.clone()))
            .send()
            .await
            .map_err(|e| StoreError::Internal(format!("DynamoDB put_item error: {}", e)))?;

        Ok(())
    }

    async fn get(&self, user_id: &str, task_id: &str) -> Result<Option<Task>, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("userId", AttributeValue::S(user_id.to_string()))
            .key("taskId", AttributeValue::S(task_id.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| StoreError::Internal(format!("DynamoDB get_item error: {}", e)))?;

        Ok(result.item().map(Self::item_to_task))
    }

    async fn update(
        &self,
        user_id: &str,
        task_id: &str,
        payload: &UpdateTaskPayload,
    ) -> Result<(), StoreError> {
        // "name" is a DynamoDB reserved word, so every updated field goes
        // through an expression alias
        let mut update_expr = vec!["#name = :name", "#dueDate = :dueDate"];
        let mut expr_names = HashMap::new();
        let mut expr_values = HashMap::new();

        expr_names.insert("#name".to_string(), "name".to_string());
        expr_names.insert("#dueDate".to_string(), "dueDate".to_string());
        expr_values.insert(":name".to_string(), AttributeValue::S(payload.name.clone()));
        expr_values.insert(
            ":dueDate".to_string(),
            AttributeValue::S(payload.due_date.clone()),
        );

        if let Some(done) = payload.done {
            update_expr.push("#done = :done");
            expr_names.insert("#done".to_string(), "done".to_string());
            expr_values.insert(":done".to_string(), AttributeValue::Bool(done));
        }

        let mut builder = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("userId", AttributeValue::S(user_id.to_string()))
            .key("taskId", AttributeValue::S(task_id.to_string()))
            .update_expression(format!("SET {}", update_expr.join(", ")))
            .condition_expression("attribute_exists(userId)");

        for (k, v) in expr_names {
            builder = builder.expression_attribute_names(k, v);
        }
        for (k, v) in expr_values {
            builder = builder.expression_attribute_values(k, v);
        }

        match builder.send().await {
            Ok(_) => Ok(()),
            Err(e) if Self::is_update_condition_failure(&e) => {
                Err(StoreError::NotFound(format!("task {}", task_id)))
            }
            Err(e) => Err(StoreError::Internal(format!(
                "DynamoDB update_item error: {}",
                e
            ))),
        }
    }

    async fn delete(&self, user_id: &str, task_id: &str) -> Result<(), StoreError> {
        let result = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key("userId", AttributeValue::S(user_id.to_string()))
            .key("taskId", AttributeValue::S(task_id.to_string()))
            .condition_expression("attribute_exists(userId)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if Self::is_delete_condition_failure(&e) => {
                Err(StoreError::NotFound(format!("task {}", task_id)))
            }
            Err(e) => Err(StoreError::Internal(format!(
                "DynamoDB delete_item error: {}",
                e
            ))),
        }
    }

    async fn set_attachment_url(
        &self,
        user_id: &str,
        task_id: &str,
        url: &str,
    ) -> Result<(), StoreError> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("userId", AttributeValue::S(user_id.to_string()))
            .key("taskId", AttributeValue::S(task_id.to_string()))
            .update_expression("SET attachmentUrl = :attachmentUrl")
            .expression_attribute_values(":attachmentUrl", AttributeValue::S(url.to_string()))
            .condition_expression("attribute_exists(userId)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if Self::is_update_condition_failure(&e) => {
                Err(StoreError::NotFound(format!("task {}", task_id)))
            }
            Err(e) => Err(StoreError::Internal(format!(
                "DynamoDB update_item error: {}",
                e
            ))),
        }
    }
}

/// In-process task store backed by a map, used by tests and local runs.
#[derive(Default)]
pub struct MemoryTaskStore {
    items: Mutex<HashMap<(String, String), Task>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<(String, String), Task>>, StoreError> {
        self.items
            .lock()
            .map_err(|_| StoreError::Internal("task store lock poisoned".to_string()))
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn list(&self, user_id: &str) -> Result<Vec<Task>, StoreError> {
        let items = self.lock()?;
        Ok(items
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create(&self, task: &Task) -> Result<(), StoreError> {
        let mut items = self.lock()?;
        items.insert((task.user_id.clone(), task.task_id.clone()), task.clone());
        Ok(())
    }

    async fn get(&self, user_id: &str, task_id: &str) -> Result<Option<Task>, StoreError> {
        let items = self.lock()?;
        Ok(items
            .get(&(user_id.to_string(), task_id.to_string()))
            .cloned())
    }

    async fn update(
        &self,
        user_id: &str,
        task_id: &str,
        payload: &UpdateTaskPayload,
    ) -> Result<(), StoreError> {
        let mut items = self.lock()?;
        match items.get_mut(&(user_id.to_string(), task_id.to_string())) {
            Some(task) => {
                task.name = payload.name.clone();
                task.due_date = payload.due_date.clone();
                if let Some(done) = payload.done {
                    task.done = done;
                }
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("task {}", task_id))),
        }
    }

    async fn delete(&self, user_id: &str, task_id: &str) -> Result<(), StoreError> {
        let mut items = self.lock()?;
        items
            .remove(&(user_id.to_string(), task_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("task {}", task_id)))
    }

    async fn set_attachment_url(
        &self,
        user_id: &str,
        task_id: &str,
        url: &str,
    ) -> Result<(), StoreError> {
        let mut items = self.lock()?;
        match items.get_mut(&(user_id.to_string(), task_id.to_string())) {
            Some(task) => {
                task.attachment_url = url.to_string();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("task {}", task_id))),
        }
    }
}
