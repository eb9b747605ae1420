/// Synchronization errors against the remote shared store.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("remote store is not connected")]
    NotConnected,

    #[error("authentication is not ready")]
    AuthNotReady,

    #[error("remote call exceeded the {secs}s bound")]
    Timeout { secs: u64 },

    #[error("transport error: {reason}")]
    Transport { reason: String },

    #[error("malformed payload for collection {collection}")]
    MalformedPayload { collection: String },
}

impl SyncError {
    /// Connectivity and timeout failures may be retried; a malformed
    /// payload will not fix itself.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::NotConnected
                | SyncError::AuthNotReady
                | SyncError::Timeout { .. }
                | SyncError::Transport { .. }
        )
    }
}
