use serde::{Deserialize, Serialize};

/// Task domain model - one record owned by a single tenant (user)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Task {
    /// Tenant owning this record; partition key in DynamoDB
    #[serde(rename = "userId")]
    pub user_id: String,

    /// Random UUID assigned at creation; sort key in DynamoDB
    #[serde(rename = "taskId")]
    pub task_id: String,

    pub name: String,

    #[serde(rename = "dueDate")]
    pub due_date: String,

    pub done: bool,

    /// RFC 3339 creation timestamp, immutable after insert
    #[serde(rename = "createdAt")]
    pub created_at: String,

    // Empty string until an upload URL has been issued
    #[serde(rename = "attachmentUrl")]
    pub attachment_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskPayload {
    pub name: String,
    #[serde(rename = "dueDate")]
    pub due_date: String,
}

/// Update payload; `done` is only applied when the caller supplied it,
/// an absent flag leaves the stored value untouched
#[derive(Debug, Deserialize)]
pub struct UpdateTaskPayload {
    pub name: String,
    #[serde(rename = "dueDate")]
    pub due_date: String,
    pub done: Option<bool>,
}

/// Short-lived permission to PUT one object into the attachment bucket
#[derive(Debug, Serialize)]
pub struct UploadGrant {
    #[serde(rename = "uploadUrl")]
    pub upload_url: String,
    #[serde(rename = "expiresIn")]
    pub expires_in: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_serializes_with_wire_field_names() {
        let task = Task {
            user_id: "auth0|u1".to_string(),
            task_id: "t-1".to_string(),
            name: "buy milk".to_string(),
            due_date: "2024-01-01".to_string(),
            done: false,
            created_at: "2024-01-01T00:00:00+00:00".to_string(),
            attachment_url: String::new(),
        };

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["userId"], "auth0|u1");
        assert_eq!(json["taskId"], "t-1");
        assert_eq!(json["dueDate"], "2024-01-01");
        assert_eq!(json["createdAt"], "2024-01-01T00:00:00+00:00");
        assert_eq!(json["attachmentUrl"], "");
        assert_eq!(json["done"], false);
    }

    #[test]
    fn upload_grant_serializes_with_wire_field_names() {
        let grant = UploadGrant {
            upload_url: "https://b.s3.amazonaws.com/t1?X-Amz-Signature=x".to_string(),
            expires_in: 300,
        };

        let json = serde_json::to_value(&grant).unwrap();
        assert_eq!(json["uploadUrl"], "https://b.s3.amazonaws.com/t1?X-Amz-Signature=x");
        assert_eq!(json["expiresIn"], 300);
    }

    #[test]
    fn update_payload_without_done_deserializes_to_none() {
        let payload: UpdateTaskPayload =
            serde_json::from_str(r#"{"name":"buy milk","dueDate":"2024-01-02"}"#).unwrap();
        assert_eq!(payload.name, "buy milk");
        assert_eq!(payload.due_date, "2024-01-02");
        assert!(payload.done.is_none());

        let payload: UpdateTaskPayload =
            serde_json::from_str(r#"{"name":"buy milk","dueDate":"2024-01-02","done":true}"#)
                .unwrap();
        assert_eq!(payload.done, Some(true));
    }
}
