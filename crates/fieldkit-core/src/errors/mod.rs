//! Error types for the Fieldkit workspace.
//!
//! Each domain gets its own `thiserror` enum; `FieldkitError` aggregates
//! them so call sites can propagate with `?` across crate boundaries.

mod account_error;
mod lifecycle_error;
mod sync_error;

pub use account_error::AccountError;
pub use lifecycle_error::LifecycleError;
pub use sync_error::SyncError;

/// Top-level error for the Fieldkit workspace.
#[derive(Debug, thiserror::Error)]
pub enum FieldkitError {
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("account error: {0}")]
    Account(#[from] AccountError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {reason}")]
    Config { reason: String },
}

/// Result alias used across the workspace.
pub type FieldkitResult<T> = Result<T, FieldkitError>;

impl FieldkitError {
    /// Whether the caller may recover by scheduling a retry.
    ///
    /// Connectivity and timeout failures are retryable; concurrency and
    /// validation failures require the caller to re-read current state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FieldkitError::Sync(e) if e.is_retryable())
    }
}
