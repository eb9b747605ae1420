//! The `RemoteStore` trait, the seam to the remote synchronization service.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fieldkit_core::errors::{FieldkitResult, SyncError};
use fieldkit_core::models::Collection;

use crate::protocol::CollectionEnvelope;

/// Invoked when a remote change is delivered for a subscribed collection.
pub type ChangeHandler = Arc<dyn Fn(CollectionEnvelope) + Send + Sync>;

/// Invoked on connectivity transitions as `(is_connected, was_connected)`.
pub type ConnectionListener = Arc<dyn Fn(bool, bool) + Send + Sync>;

/// An addressable, authenticated, real-time-capable remote store holding one
/// envelope per named collection.
///
/// Implementations are injected at construction; nothing in the workspace
/// probes for capabilities at runtime. Every call that crosses this seam is
/// awaitable and must be wrapped with [`bounded`] by the caller.
pub trait RemoteStore: Send + Sync + 'static {
    /// Fetch the current envelope for a collection, `None` if never written.
    fn get(
        &self,
        collection: Collection,
    ) -> impl Future<Output = FieldkitResult<Option<CollectionEnvelope>>> + Send;

    /// Replace the envelope for a collection wholesale.
    fn set(
        &self,
        collection: Collection,
        envelope: CollectionEnvelope,
    ) -> impl Future<Output = FieldkitResult<()>> + Send;

    /// Register for push delivery on a collection.
    ///
    /// Re-registering replaces any prior handler for the same collection;
    /// a subscription must never produce duplicate delivery.
    fn subscribe(
        &self,
        collection: Collection,
        handler: ChangeHandler,
    ) -> impl Future<Output = FieldkitResult<()>> + Send;

    /// Cancel push delivery for a collection. Unsubscribing a collection
    /// with no active handler is a no-op.
    fn unsubscribe(
        &self,
        collection: Collection,
    ) -> impl Future<Output = FieldkitResult<()>> + Send;

    /// Whether the remote is currently reachable.
    fn is_connected(&self) -> bool;

    /// Whether authentication has completed. Distinct from connectivity:
    /// a connected transport can still be pre-auth.
    fn auth_ready(&self) -> bool;

    /// Install the connectivity transition listener. At most one listener
    /// is active; installing replaces the previous one.
    fn set_connection_listener(&self, listener: ConnectionListener);
}

/// Run a remote call under a bounded timeout.
///
/// Resolves to `SyncError::Timeout` instead of hanging indefinitely.
pub async fn bounded<T, F>(limit: Duration, call: F) -> FieldkitResult<T>
where
    F: Future<Output = FieldkitResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(SyncError::Timeout {
            secs: limit.as_secs(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldkit_core::errors::FieldkitError;

    #[tokio::test(start_paused = true)]
    async fn bounded_resolves_to_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        };
        let err = bounded(Duration::from_secs(8), slow).await.unwrap_err();
        match err {
            FieldkitError::Sync(SyncError::Timeout { secs }) => assert_eq!(secs, 8),
            other => panic!("expected timeout, got {other}"),
        }
    }

    #[tokio::test]
    async fn bounded_passes_through_fast_results() {
        let fast = async { Ok(42u32) };
        assert_eq!(bounded(Duration::from_secs(8), fast).await.unwrap(), 42);
    }
}
