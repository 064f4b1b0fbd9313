pub mod model;
pub mod store;

pub use model::{CreateTaskPayload, Task, UpdateTaskPayload, UploadGrant};
pub use store::{DynamoTaskStore, MemoryTaskStore, TaskStore};
