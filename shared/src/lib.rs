pub mod auth;
pub mod config;
pub mod error;
pub mod service;
pub mod testing;

// ========== TASKS ==========
pub use taskbox_atoms::tasks::{
    CreateTaskPayload, DynamoTaskStore, MemoryTaskStore, Task, TaskStore, UpdateTaskPayload,
    UploadGrant,
};

// ========== ATTACHMENTS ==========
pub use taskbox_atoms::attachments::{AttachmentStore, MemoryAttachmentStore, S3AttachmentStore};

// ========== ERRORS ==========
pub use taskbox_atoms::error::StoreError;

pub use auth::{AuthError, TenantClaim, TokenVerifier};
pub use config::Config;
pub use error::ServiceError;
pub use service::TaskService;
