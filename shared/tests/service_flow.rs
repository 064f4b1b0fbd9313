//! End-to-end orchestration tests: task service over in-process stores
//! with a static issuer key set, exercising the full verify → store →
//! blob-store flow.

use taskbox_shared::testing::{bearer, test_context};
use taskbox_shared::{
    AttachmentStore, CreateTaskPayload, ServiceError, TaskStore, UpdateTaskPayload,
};

fn payload(name: &str, due_date: &str) -> CreateTaskPayload {
    CreateTaskPayload {
        name: name.to_string(),
        due_date: due_date.to_string(),
    }
}

#[tokio::test]
async fn created_task_is_listed_for_its_tenant_only() {
    let ctx = test_context();
    let u1 = ctx.identity.token_for("auth0|u1");
    let u2 = ctx.identity.token_for("auth0|u2");

    let created = ctx
        .service
        .create_task(Some(&bearer(&u1)), payload("buy milk", "2024-01-01"))
        .await
        .unwrap();

    assert!(!created.done);
    assert_eq!(created.attachment_url, "");
    assert!(!created.task_id.is_empty());
    assert!(!created.created_at.is_empty());

    let u1_tasks = ctx.service.list_tasks(Some(&bearer(&u1))).await.unwrap();
    assert_eq!(u1_tasks.len(), 1);
    assert_eq!(u1_tasks[0].task_id, created.task_id);
    assert_eq!(u1_tasks[0].name, "buy milk");
    assert_eq!(u1_tasks[0].due_date, "2024-01-01");

    let u2_tasks = ctx.service.list_tasks(Some(&bearer(&u2))).await.unwrap();
    assert!(u2_tasks.is_empty());
}

#[tokio::test]
async fn other_tenants_cannot_mutate_a_record() {
    let ctx = test_context();
    let owner = ctx.identity.token_for("auth0|owner");
    let other = ctx.identity.token_for("auth0|other");

    let created = ctx
        .service
        .create_task(Some(&bearer(&owner)), payload("buy milk", "2024-01-01"))
        .await
        .unwrap();

    let update = UpdateTaskPayload {
        name: "hijacked".to_string(),
        due_date: "2030-01-01".to_string(),
        done: Some(true),
    };
    let err = ctx
        .service
        .update_task(Some(&bearer(&other)), &created.task_id, update)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = ctx
        .service
        .delete_task(Some(&bearer(&other)), &created.task_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = ctx
        .service
        .generate_upload_url(Some(&bearer(&other)), &created.task_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    // The owner's record is untouched by all three attempts
    let tasks = ctx.service.list_tasks(Some(&bearer(&owner))).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name, "buy milk");
    assert!(!tasks[0].done);
    assert_eq!(tasks[0].attachment_url, "");
}

#[tokio::test]
async fn update_changes_done_only_when_the_payload_carries_it() {
    let ctx = test_context();
    let token = ctx.identity.token_for("auth0|u1");

    let created = ctx
        .service
        .create_task(Some(&bearer(&token)), payload("buy milk", "2024-01-01"))
        .await
        .unwrap();

    let mark_done = UpdateTaskPayload {
        name: "buy milk".to_string(),
        due_date: "2024-01-01".to_string(),
        done: Some(true),
    };
    ctx.service
        .update_task(Some(&bearer(&token)), &created.task_id, mark_done)
        .await
        .unwrap();

    // A rename without the flag must not reset completion
    let rename_only = UpdateTaskPayload {
        name: "buy oat milk".to_string(),
        due_date: "2024-01-02".to_string(),
        done: None,
    };
    ctx.service
        .update_task(Some(&bearer(&token)), &created.task_id, rename_only)
        .await
        .unwrap();

    let tasks = ctx.service.list_tasks(Some(&bearer(&token))).await.unwrap();
    assert_eq!(tasks[0].name, "buy oat milk");
    assert_eq!(tasks[0].due_date, "2024-01-02");
    assert!(tasks[0].done);
}

#[tokio::test]
async fn lifecycle_create_upload_delete_cleans_up() {
    let ctx = test_context();
    let token = ctx.identity.token_for("auth0|u1");

    let created = ctx
        .service
        .create_task(Some(&bearer(&token)), payload("buy milk", "2024-01-01"))
        .await
        .unwrap();

    let grant = ctx
        .service
        .generate_upload_url(Some(&bearer(&token)), &created.task_id)
        .await
        .unwrap();

    let object_url = ctx.attachments.object_url(&created.task_id);
    let stored = ctx
        .store
        .get("auth0|u1", &created.task_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.attachment_url, object_url);
    assert_ne!(grant.upload_url, object_url);
    assert!(grant.expires_in > 0);

    ctx.service
        .delete_task(Some(&bearer(&token)), &created.task_id)
        .await
        .unwrap();

    assert!(ctx.service.list_tasks(Some(&bearer(&token))).await.unwrap().is_empty());
    assert_eq!(ctx.attachments.deleted_ids(), vec![created.task_id]);
}

#[tokio::test]
async fn bad_credentials_are_denied_before_any_task_operation() {
    let ctx = test_context();
    let expired = ctx.identity.expired_token_for("auth0|u1");

    let attempts = [
        None,
        Some("Bearer not-a-jwt".to_string()),
        Some(bearer(&expired)),
    ];

    for header in attempts {
        let err = ctx
            .service
            .list_tasks(header.as_deref())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Auth(_)));
        assert_eq!(err.status_code(), 401);
    }

    // No task operation ran on behalf of the expired token's subject
    assert!(ctx.store.list("auth0|u1").await.unwrap().is_empty());
}
