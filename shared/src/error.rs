use thiserror::Error;

use taskbox_atoms::error::StoreError;

use crate::auth::AuthError;

/// Operation outcomes surfaced to the transport layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Uniform access denial; the underlying reason stays in internal logs.
    #[error("access denied")]
    Auth(#[from] AuthError),

    /// The record does not exist for the resolved tenant; a "nothing to
    /// do" outcome, not a server fault.
    #[error("not found: {0}")]
    NotFound(String),

    /// Unexpected store or blob-store failure; opaque to callers, no retry.
    #[error("store failure: {0}")]
    Store(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ServiceError::NotFound(what),
            StoreError::Internal(detail) => ServiceError::Store(detail),
        }
    }
}

impl ServiceError {
    /// Conventional HTTP mapping for the transport collaborator.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Auth(_) => 401,
            ServiceError::NotFound(_) => 404,
            ServiceError::Store(_) => 500,
        }
    }
}
