//! `SyncOrchestrator`: debounced scheduling, single-flight execution,
//! pull-and-apply, and push subscription re-arming.
//!
//! One orchestrator is constructed per session with its dependencies passed
//! in explicitly; there is no ambient global state. All real concurrency
//! originates across sessions, so the single-flight slot is the only
//! mutual-exclusion primitive this layer needs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use fieldkit_cache::WorkingCache;
use fieldkit_core::config::SyncConfig;
use fieldkit_core::errors::{FieldkitError, FieldkitResult, SyncError};
use fieldkit_core::models::{Collection, StateSnapshot, UserAccount};
use fieldkit_remote::{bounded, ChangeHandler, CollectionEnvelope, RemoteStore};

use crate::snapshot::{merge_users, resolve_snapshot, SnapshotSide};

/// Why a sync pass did not apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncFailure {
    NotConnected,
    AuthNotReady,
    Timeout { secs: u64 },
    Transport { reason: String },
    Malformed { collection: String },
    /// The in-flight pass this caller joined went away without publishing.
    Aborted,
}

impl SyncFailure {
    fn from_error(error: &FieldkitError) -> Self {
        match error {
            FieldkitError::Sync(SyncError::NotConnected) => SyncFailure::NotConnected,
            FieldkitError::Sync(SyncError::AuthNotReady) => SyncFailure::AuthNotReady,
            FieldkitError::Sync(SyncError::Timeout { secs }) => {
                SyncFailure::Timeout { secs: *secs }
            }
            FieldkitError::Sync(SyncError::Transport { reason }) => SyncFailure::Transport {
                reason: reason.clone(),
            },
            FieldkitError::Sync(SyncError::MalformedPayload { collection }) => {
                SyncFailure::Malformed {
                    collection: collection.clone(),
                }
            }
            other => SyncFailure::Transport {
                reason: other.to_string(),
            },
        }
    }

    /// Whether scheduling a debounced retry makes sense. Connectivity
    /// failures wait for the reconnect event instead.
    fn wants_retry(&self) -> bool {
        matches!(
            self,
            SyncFailure::Timeout { .. } | SyncFailure::Transport { .. }
        )
    }
}

impl std::fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncFailure::NotConnected => write!(f, "not connected"),
            SyncFailure::AuthNotReady => write!(f, "auth not ready"),
            SyncFailure::Timeout { secs } => write!(f, "timed out after {secs}s"),
            SyncFailure::Transport { reason } => write!(f, "transport: {reason}"),
            SyncFailure::Malformed { collection } => {
                write!(f, "malformed payload for {collection}")
            }
            SyncFailure::Aborted => write!(f, "in-flight sync aborted"),
        }
    }
}

/// Summary of an applied sync pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Collections pulled and applied to the cache.
    pub collections_applied: usize,
    /// Whether the user merge diverged from the raw remote set.
    pub users_reconciled: bool,
    /// The reason the pass ran, for log correlation.
    pub reason: String,
}

/// Shared outcome of a sync pass. Every caller that joined the same
/// in-flight pass observes the same value.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Applied(SyncReport),
    Failed(SyncFailure),
}

impl SyncOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, SyncOutcome::Applied(_))
    }
}

struct Inner<R> {
    cache: Arc<WorkingCache>,
    remote: Arc<R>,
    config: SyncConfig,
    session_id: String,
    runtime: tokio::runtime::Handle,
    /// True while a debounce timer is pending; later bursts coalesce into it.
    debounce_armed: AtomicBool,
    /// Single-flight slot: the receiver half of the in-flight pass, if any.
    inflight: Mutex<Option<watch::Receiver<Option<SyncOutcome>>>>,
}

/// The sync orchestrator. Cheap to clone; clones share all state.
pub struct SyncOrchestrator<R: RemoteStore> {
    inner: Arc<Inner<R>>,
}

impl<R: RemoteStore> Clone for SyncOrchestrator<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: RemoteStore> SyncOrchestrator<R> {
    /// Build an orchestrator for one session.
    ///
    /// Must be called from within a tokio runtime; the runtime handle is
    /// captured for debounce timers and listener-triggered syncs.
    pub fn new(
        cache: Arc<WorkingCache>,
        remote: Arc<R>,
        config: SyncConfig,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                remote,
                config,
                session_id: session_id.into(),
                runtime: tokio::runtime::Handle::current(),
                debounce_armed: AtomicBool::new(false),
                inflight: Mutex::new(None),
            }),
        }
    }

    /// The writer identity this session stamps on remote writes.
    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    /// Install the connectivity listener on the remote store: a
    /// disconnected-to-connected transition schedules a sync. Debounce plus
    /// single-flight collapse it into any pass a local mutation scheduled
    /// moments earlier, which gives the required ordering.
    pub fn attach_reconnect_listener(&self) {
        let this = self.clone();
        self.inner
            .remote
            .set_connection_listener(Arc::new(move |is_connected, was_connected| {
                if is_connected && !was_connected {
                    this.schedule_sync("reconnected");
                }
            }));
    }

    /// Request a sync without blocking. Bursts of calls within the debounce
    /// window coalesce into a single underlying pass.
    pub fn schedule_sync(&self, reason: &str) {
        if self.inner.debounce_armed.swap(true, Ordering::AcqRel) {
            debug!(reason, "sync already scheduled, coalescing");
            return;
        }
        debug!(reason, "sync scheduled");
        let this = self.clone();
        let reason = reason.to_string();
        self.inner.runtime.spawn(async move {
            tokio::time::sleep(this.inner.config.debounce_window()).await;
            this.inner.debounce_armed.store(false, Ordering::Release);
            let outcome = this.run_sync(&reason).await;
            if let SyncOutcome::Failed(failure) = outcome {
                warn!(reason, %failure, "scheduled sync failed");
            }
        });
    }

    /// Run a sync now. Single-flight: if a pass is already in flight,
    /// join it and observe the same outcome instead of starting another.
    #[instrument(skip(self))]
    pub async fn run_sync(&self, reason: &str) -> SyncOutcome {
        enum Role {
            Leader(watch::Sender<Option<SyncOutcome>>),
            Follower(watch::Receiver<Option<SyncOutcome>>),
        }

        let role = {
            let mut slot = self.inner.inflight.lock().expect("inflight slot poisoned");
            if let Some(rx) = slot.as_ref() {
                Role::Follower(rx.clone())
            } else {
                let (tx, rx) = watch::channel(None);
                *slot = Some(rx);
                Role::Leader(tx)
            }
        };

        let publisher = match role {
            Role::Leader(tx) => tx,
            Role::Follower(rx) => {
                debug!(reason, "joining in-flight sync");
                return Self::join_inflight(rx).await;
            }
        };

        let outcome = self.sync_pass(reason).await;

        *self.inner.inflight.lock().expect("inflight slot poisoned") = None;
        let _ = publisher.send(Some(outcome.clone()));

        if let SyncOutcome::Failed(failure) = &outcome {
            if failure.wants_retry() {
                self.schedule_sync("retry");
            }
        }
        outcome
    }

    /// Cross-session bootstrap through the consolidated snapshot path.
    ///
    /// Assembles the remote snapshot from the per-collection envelopes,
    /// resolves it against the caller's persisted `local` snapshot by write
    /// timestamp, applies the winner to the cache, and pushes a winning
    /// local snapshot back up so its unsynced edits are not dropped.
    /// Intended to run once at session start, before `schedule_sync`
    /// traffic begins.
    #[instrument(skip(self, local))]
    pub async fn bootstrap(&self, local: StateSnapshot) -> FieldkitResult<SnapshotSide> {
        let inner = &self.inner;
        if !inner.remote.is_connected() {
            return Err(SyncError::NotConnected.into());
        }
        if !inner.remote.auth_ready() {
            return Err(SyncError::AuthNotReady.into());
        }

        let remote_snapshot = self.pull_snapshot().await?;
        let resolution = resolve_snapshot(&local, &remote_snapshot);
        let side = resolution.side;
        let staged: Vec<(Collection, serde_json::Value)> = resolution
            .chosen
            .collections
            .iter()
            .map(|(collection, value)| (*collection, value.clone()))
            .collect();
        inner.cache.set_many(staged);

        if resolution.needs_push_back() {
            let limit = inner.config.remote_timeout();
            for (collection, value) in &local.collections {
                let envelope = CollectionEnvelope::now(value.clone(), inner.session_id.clone());
                if let Err(error) = bounded(limit, inner.remote.set(*collection, envelope)).await {
                    warn!(%collection, %error, "push-back of winning local snapshot failed");
                }
            }
        }

        self.rearm_subscriptions().await;
        info!(?side, "bootstrap applied");
        Ok(side)
    }

    /// Assemble a consolidated snapshot from the per-collection envelopes.
    /// The snapshot's write metadata is that of the newest envelope; a
    /// remote with no envelopes at all dates to the epoch so any real local
    /// snapshot outranks it.
    async fn pull_snapshot(&self) -> FieldkitResult<StateSnapshot> {
        let inner = &self.inner;
        let limit = inner.config.remote_timeout();
        let mut collections = HashMap::new();
        let mut updated_at = DateTime::<Utc>::UNIX_EPOCH;
        let mut updated_by = String::new();
        for collection in Collection::ALL {
            if let Some(envelope) = bounded(limit, inner.remote.get(collection)).await? {
                if envelope.updated_at > updated_at {
                    updated_at = envelope.updated_at;
                    updated_by = envelope.writer_id.clone();
                }
                collections.insert(collection, envelope.payload);
            }
        }
        Ok(StateSnapshot {
            collections,
            updated_at,
            updated_by,
        })
    }

    async fn join_inflight(mut rx: watch::Receiver<Option<SyncOutcome>>) -> SyncOutcome {
        loop {
            if let Some(outcome) = rx.borrow_and_update().clone() {
                return outcome;
            }
            if rx.changed().await.is_err() {
                return SyncOutcome::Failed(SyncFailure::Aborted);
            }
        }
    }

    /// One full pull-and-apply pass. The cache is only touched after every
    /// collection pulled successfully, so a failed pass leaves it untouched.
    async fn sync_pass(&self, reason: &str) -> SyncOutcome {
        let inner = &self.inner;
        if !inner.remote.is_connected() {
            return SyncOutcome::Failed(SyncFailure::NotConnected);
        }
        if !inner.remote.auth_ready() {
            return SyncOutcome::Failed(SyncFailure::AuthNotReady);
        }

        let limit = inner.config.remote_timeout();
        let mut staged: Vec<(Collection, serde_json::Value)> = Vec::new();
        let mut reconciled_users: Option<Vec<UserAccount>> = None;

        for collection in Collection::ALL {
            let envelope = match bounded(limit, inner.remote.get(collection)).await {
                Ok(Some(envelope)) => envelope,
                Ok(None) => continue,
                Err(error) => {
                    warn!(%collection, %error, "pull failed");
                    return SyncOutcome::Failed(SyncFailure::from_error(&error));
                }
            };

            if collection == Collection::Users {
                match self.stage_users(envelope, &mut staged) {
                    Ok(push_back) => reconciled_users = push_back,
                    Err(failure) => return SyncOutcome::Failed(failure),
                }
            } else {
                staged.push((collection, envelope.payload));
            }
        }

        let collections_applied = staged.len();
        let users_reconciled = reconciled_users.is_some();
        inner.cache.set_many(staged);

        if inner.config.push_reconciled_users {
            if let Some(users) = reconciled_users {
                self.push_users(users).await;
            }
        }

        self.rearm_subscriptions().await;

        info!(reason, collections_applied, users_reconciled, "sync applied");
        SyncOutcome::Applied(SyncReport {
            collections_applied,
            users_reconciled,
            reason: reason.to_string(),
        })
    }

    /// Merge the pulled user set against the local one and stage the result.
    /// Returns the merged set when it diverges from the raw remote and
    /// should be pushed back.
    fn stage_users(
        &self,
        envelope: CollectionEnvelope,
        staged: &mut Vec<(Collection, serde_json::Value)>,
    ) -> Result<Option<Vec<UserAccount>>, SyncFailure> {
        let remote_users: Vec<UserAccount> = serde_json::from_value(envelope.payload)
            .map_err(|_| SyncFailure::Malformed {
                collection: Collection::Users.key().to_string(),
            })?;
        let local_users = match self.inner.cache.users() {
            Ok(users) => users.unwrap_or_default(),
            // A locally cached value that no longer decodes is dropped in
            // favor of the authoritative remote set.
            Err(_) => Vec::new(),
        };

        let merge = merge_users(&local_users, &remote_users);
        let value = serde_json::to_value(&merge.merged).map_err(|_| SyncFailure::Malformed {
            collection: Collection::Users.key().to_string(),
        })?;
        staged.push((Collection::Users, value));

        Ok(merge.differs_from_remote.then_some(merge.merged))
    }

    /// Push the reconciled user set back up. Best-effort: a failure here is
    /// logged and left for the next pass, the pulled state already applied.
    async fn push_users(&self, users: Vec<UserAccount>) {
        let inner = &self.inner;
        let payload = match serde_json::to_value(&users) {
            Ok(value) => value,
            Err(error) => {
                warn!(%error, "reconciled user set did not serialize");
                return;
            }
        };
        let envelope = CollectionEnvelope::now(payload, inner.session_id.clone());
        let limit = inner.config.remote_timeout();
        if let Err(error) = bounded(limit, inner.remote.set(Collection::Users, envelope)).await {
            warn!(%error, "push-back of reconciled users failed, next sync retries");
        }
    }

    /// Re-establish push subscriptions for every tracked collection.
    ///
    /// Unsubscribe-then-subscribe keeps re-registration idempotent; delivery
    /// from this session's own writes is dropped to prevent loops.
    async fn rearm_subscriptions(&self) {
        let inner = &self.inner;
        let limit = inner.config.remote_timeout();
        for collection in Collection::ALL {
            if let Err(error) = bounded(limit, inner.remote.unsubscribe(collection)).await {
                debug!(%collection, %error, "unsubscribe before re-arm failed");
            }
            let cache = Arc::clone(&inner.cache);
            let session_id = inner.session_id.clone();
            let handler: ChangeHandler = Arc::new(move |envelope: CollectionEnvelope| {
                if envelope.writer_id == session_id {
                    return;
                }
                cache.set(collection, envelope.payload);
            });
            if let Err(error) = bounded(limit, inner.remote.subscribe(collection, handler)).await {
                warn!(%collection, %error, "subscription re-arm failed");
            }
        }
    }
}
