use thiserror::Error;

/// Errors surfaced by the record and attachment store adapters.
///
/// `NotFound` is an expected outcome for mutations against a missing
/// (tenant, task) pair; `Internal` wraps unexpected SDK failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Internal(String),
}
