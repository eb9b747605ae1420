//! `LifecycleEngine`: create, transition, save, and delete requisitions
//! under optimistic concurrency; user account writes with secondary-key
//! enforcement.
//!
//! Write path: the new collection value is persisted to the remote first and
//! applied to the working cache only once the remote acknowledges, so the
//! cache never shows an unconfirmed business mutation. On failure the cache
//! is left exactly as it was and the error is surfaced.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use fieldkit_cache::WorkingCache;
use fieldkit_core::config::SyncConfig;
use fieldkit_core::errors::{AccountError, FieldkitError, FieldkitResult, LifecycleError, SyncError};
use fieldkit_core::models::{
    ApprovalDecision, ApprovalEntry, AuditInfo, Collection, Requisition, RequisitionDraft,
    RequisitionStatus, TimelineEntry, TimelineEvent, UserAccount,
};
use fieldkit_remote::{bounded, CollectionEnvelope, RemoteStore};

use crate::sequence::{counter_under_prefix, next_sequence_number, sequence_prefix};
use crate::transitions::{is_active_pipeline, is_transition_allowed};

/// Entity fields merged atomically with a status change.
#[derive(Debug, Clone, Default)]
pub struct TransitionExtra {
    pub supplier: Option<String>,
    pub tracking_code: Option<String>,
    pub rejection_reason: Option<String>,
    pub comment: Option<String>,
}

/// Result of a batch approval: per-id independent, partial success.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failures: Vec<(String, FieldkitError)>,
}

/// The requisition lifecycle engine, one per session.
pub struct LifecycleEngine<R: RemoteStore> {
    cache: Arc<WorkingCache>,
    remote: Arc<R>,
    config: SyncConfig,
    session_id: String,
    /// Highest sequence counter handed out per date prefix this session;
    /// keeps numbers from being reused across draft deletions.
    sequence_floor: Mutex<HashMap<String, u64>>,
}

impl<R: RemoteStore> LifecycleEngine<R> {
    pub fn new(
        cache: Arc<WorkingCache>,
        remote: Arc<R>,
        config: SyncConfig,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            remote,
            config,
            session_id: session_id.into(),
            sequence_floor: Mutex::new(HashMap::new()),
        }
    }

    /// Create a requisition from a draft.
    ///
    /// Assigns the id and the next sequence number under today's date
    /// prefix, seeds audit at version 1 and the timeline with one `created`
    /// event, and computes totals.
    #[instrument(skip(self, draft), fields(technician = %draft.technician))]
    pub async fn create_requisition(
        &self,
        draft: RequisitionDraft,
        actor: &str,
    ) -> FieldkitResult<Requisition> {
        for item in &draft.line_items {
            item.validate()?;
        }
        if draft.discount.is_sign_negative() {
            return Err(LifecycleError::InvalidAmount {
                reason: "discount must be non-negative".to_string(),
            }
            .into());
        }
        if draft.freight.is_sign_negative() {
            return Err(LifecycleError::InvalidAmount {
                reason: "freight must be non-negative".to_string(),
            }
            .into());
        }

        let mut requisitions = self.requisitions_for_update().await?;
        let now = Utc::now();
        let today = now.date_naive();
        let sequence_number = {
            let mut floors = self.sequence_floor.lock().expect("sequence floor poisoned");
            let prefix = sequence_prefix(today);
            let floor = floors.get(&prefix).copied().unwrap_or(0);
            let number = next_sequence_number(&requisitions, today, floor);
            if let Some(counter) = counter_under_prefix(&number, &prefix) {
                floors.insert(prefix, counter);
            }
            number
        };

        let mut requisition = Requisition {
            id: Uuid::new_v4().to_string(),
            sequence_number,
            status: RequisitionStatus::Draft,
            technician: draft.technician,
            supplier: None,
            tracking_code: None,
            rejection_reason: None,
            notes: draft.notes,
            line_items: draft.line_items,
            subtotal: Default::default(),
            discount: draft.discount,
            freight: draft.freight,
            total: Default::default(),
            audit: AuditInfo {
                version: 1,
                created_at: now,
                created_by: actor.to_string(),
                last_updated_at: now,
                last_updated_by: actor.to_string(),
            },
            timeline: vec![TimelineEntry {
                event: TimelineEvent::Created,
                from: None,
                to: Some(RequisitionStatus::Draft),
                at: now,
                by: actor.to_string(),
                comment: None,
            }],
            approvals: Vec::new(),
        };
        requisition.recompute_totals();

        requisitions.push(requisition.clone());
        self.persist_requisitions(requisitions).await?;
        info!(id = %requisition.id, sequence = %requisition.sequence_number, "requisition created");
        Ok(requisition)
    }

    /// Save a modified requisition under optimistic concurrency.
    ///
    /// The submitted `audit.version` must equal the stored version or the
    /// call is rejected as a version conflict with no mutation; on match the
    /// stored version advances by exactly one. Unknown ids insert at
    /// version 1.
    #[instrument(skip(self, entity), fields(id = %entity.id))]
    pub async fn save(&self, mut entity: Requisition, actor: &str) -> FieldkitResult<Requisition> {
        for item in &entity.line_items {
            item.validate()?;
        }
        if !entity.has_line_items() && entity.status != RequisitionStatus::Draft {
            return Err(LifecycleError::InvalidLineItem {
                reason: "only a draft may have zero line items".to_string(),
            }
            .into());
        }

        let mut requisitions = self.requisitions_for_update().await?;
        let position = requisitions.iter().position(|r| r.id == entity.id);
        match position {
            Some(i) => {
                let stored = &requisitions[i];
                if entity.audit.version != stored.audit.version {
                    debug!(
                        id = %entity.id,
                        submitted = entity.audit.version,
                        stored = stored.audit.version,
                        "rejecting stale write"
                    );
                    return Err(LifecycleError::VersionConflict {
                        id: entity.id.clone(),
                        submitted: entity.audit.version,
                        stored: stored.audit.version,
                    }
                    .into());
                }
                entity.audit.version = stored.audit.version + 1;
            }
            None => {
                entity.audit.version = 1;
            }
        }
        entity.audit.last_updated_at = Utc::now();
        entity.audit.last_updated_by = actor.to_string();
        entity.recompute_totals();

        match position {
            Some(i) => requisitions[i] = entity.clone(),
            None => requisitions.push(entity.clone()),
        }
        self.persist_requisitions(requisitions).await?;
        Ok(entity)
    }

    /// Apply a lifecycle transition.
    ///
    /// Validates the edge, advances the version by one, stamps the audit
    /// trail, appends one timeline entry, appends an approvals entry for
    /// approve/reject decisions, and merges `extra` in the same atomic step.
    #[instrument(skip(self, extra))]
    pub async fn apply_transition(
        &self,
        id: &str,
        target: RequisitionStatus,
        actor: &str,
        extra: TransitionExtra,
    ) -> FieldkitResult<Requisition> {
        let mut requisitions = self.requisitions_for_update().await?;
        let i = requisitions
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| LifecycleError::NotFound { id: id.to_string() })?;

        let from = requisitions[i].status;
        if !is_transition_allowed(from, target) {
            return Err(LifecycleError::InvalidTransition {
                id: id.to_string(),
                from: from.to_string(),
                to: target.to_string(),
            }
            .into());
        }
        // Zero line items are legal only while drafting; entering the
        // pipeline requires content.
        let enters_pipeline = matches!(
            target,
            RequisitionStatus::Pending | RequisitionStatus::Approved
        );
        if enters_pipeline && !requisitions[i].has_line_items() {
            return Err(LifecycleError::EmptyRequisition { id: id.to_string() }.into());
        }

        let mut updated = requisitions[i].clone();
        let now = Utc::now();
        updated.status = target;
        updated.audit.version += 1;
        updated.audit.last_updated_at = now;
        updated.audit.last_updated_by = actor.to_string();
        if let Some(supplier) = extra.supplier {
            updated.supplier = Some(supplier);
        }
        if let Some(tracking_code) = extra.tracking_code {
            updated.tracking_code = Some(tracking_code);
        }
        if let Some(rejection_reason) = extra.rejection_reason {
            updated.rejection_reason = Some(rejection_reason);
        }
        updated.timeline.push(TimelineEntry {
            event: TimelineEvent::StatusChanged,
            from: Some(from),
            to: Some(target),
            at: now,
            by: actor.to_string(),
            comment: extra.comment.clone(),
        });
        let decision = match target {
            RequisitionStatus::Approved => Some(ApprovalDecision::Approved),
            RequisitionStatus::Rejected => Some(ApprovalDecision::Rejected),
            _ => None,
        };
        if let Some(decision) = decision {
            updated.approvals.push(ApprovalEntry {
                decision,
                at: now,
                by: actor.to_string(),
                comment: extra.comment,
            });
        }

        requisitions[i] = updated.clone();
        self.persist_requisitions(requisitions).await?;
        info!(id, %from, to = %target, by = actor, "transition applied");
        Ok(updated)
    }

    /// Approve a batch of requisitions, one independent transition per id.
    ///
    /// A failure on one id never blocks or rolls back the others.
    pub async fn approve_batch(
        &self,
        ids: &[String],
        actor: &str,
        comment: Option<String>,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for id in ids {
            let extra = TransitionExtra {
                comment: comment.clone(),
                ..TransitionExtra::default()
            };
            match self
                .apply_transition(id, RequisitionStatus::Approved, actor, extra)
                .await
            {
                Ok(_) => outcome.succeeded += 1,
                Err(error) => outcome.failures.push((id.clone(), error)),
            }
        }
        outcome
    }

    /// Delete a requisition. Only a draft with no history may go away;
    /// anything past draft is soft-disabled through transitions instead.
    #[instrument(skip(self))]
    pub async fn delete_requisition(&self, id: &str) -> FieldkitResult<()> {
        let mut requisitions = self.requisitions_for_update().await?;
        let i = requisitions
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| LifecycleError::NotFound { id: id.to_string() })?;

        let stored = &requisitions[i];
        let has_history = !stored.approvals.is_empty()
            || stored
                .timeline
                .iter()
                .any(|entry| entry.event != TimelineEvent::Created);
        if stored.status != RequisitionStatus::Draft || has_history {
            return Err(LifecycleError::DeleteForbidden {
                id: id.to_string(),
                status: stored.status.to_string(),
            }
            .into());
        }

        requisitions.remove(i);
        self.persist_requisitions(requisitions).await
    }

    /// Save a user account, enforcing the case/accent-insensitive unique
    /// login name.
    #[instrument(skip(self, account), fields(id = %account.id))]
    pub async fn save_user(&self, mut account: UserAccount) -> FieldkitResult<UserAccount> {
        let mut users = self.users_for_update().await?;
        let normalized = account.normalized_login();
        if users
            .iter()
            .any(|u| u.id != account.id && u.normalized_login() == normalized)
        {
            return Err(AccountError::DuplicateSecondaryKey {
                login_name: account.login_name.clone(),
            }
            .into());
        }

        account.updated_at = Utc::now();
        match users.iter().position(|u| u.id == account.id) {
            Some(i) => users[i] = account.clone(),
            None => users.push(account.clone()),
        }
        self.persist_collection(Collection::Users, serde_json::to_value(&users)?)
            .await?;
        Ok(account)
    }

    /// Requisitions awaiting approval. Excludes the historical-manual
    /// override by construction.
    pub fn pending_queue(&self) -> FieldkitResult<Vec<Requisition>> {
        Ok(self
            .requisitions()?
            .into_iter()
            .filter(|r| r.status == RequisitionStatus::Pending)
            .collect())
    }

    /// Requisitions in the active pipeline.
    pub fn active_pipeline(&self) -> FieldkitResult<Vec<Requisition>> {
        Ok(self
            .requisitions()?
            .into_iter()
            .filter(|r| is_active_pipeline(r.status))
            .collect())
    }

    /// Current requisition list from the working cache, for queries only.
    /// Not yet hydrated reads as empty.
    fn requisitions(&self) -> FieldkitResult<Vec<Requisition>> {
        Ok(self.cache.requisitions()?.unwrap_or_default())
    }

    /// Requisition list backing a mutation.
    ///
    /// A cache that was never hydrated falls back to the current remote
    /// collection, so a fresh session's first write cannot clobber entries
    /// written by other sessions or restart sequence numbering. Absence on
    /// the remote is the one case that truly means empty.
    async fn requisitions_for_update(&self) -> FieldkitResult<Vec<Requisition>> {
        if self.cache.is_hydrated(Collection::Requisitions) {
            return self.requisitions();
        }
        self.pull_collection(Collection::Requisitions).await
    }

    /// User list backing a mutation, with the same pre-hydration fallback.
    async fn users_for_update(&self) -> FieldkitResult<Vec<UserAccount>> {
        if self.cache.is_hydrated(Collection::Users) {
            return Ok(self.cache.users()?.unwrap_or_default());
        }
        self.pull_collection(Collection::Users).await
    }

    async fn pull_collection<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> FieldkitResult<Vec<T>> {
        if !self.remote.is_connected() {
            return Err(SyncError::NotConnected.into());
        }
        let envelope = bounded(
            self.config.remote_timeout(),
            self.remote.get(collection),
        )
        .await?;
        match envelope {
            Some(envelope) => Ok(serde_json::from_value(envelope.payload)?),
            None => Ok(Vec::new()),
        }
    }

    async fn persist_requisitions(&self, requisitions: Vec<Requisition>) -> FieldkitResult<()> {
        self.persist_collection(
            Collection::Requisitions,
            serde_json::to_value(&requisitions)?,
        )
        .await
    }

    /// Persist a collection to the remote, then apply to the cache.
    ///
    /// Business writes fail closed when disconnected; there is no local
    /// fallback persistence for them.
    async fn persist_collection(
        &self,
        collection: Collection,
        payload: serde_json::Value,
    ) -> FieldkitResult<()> {
        if !self.remote.is_connected() {
            return Err(SyncError::NotConnected.into());
        }
        let envelope = CollectionEnvelope::now(payload.clone(), self.session_id.clone());
        bounded(
            self.config.remote_timeout(),
            self.remote.set(collection, envelope),
        )
        .await?;
        self.cache.set(collection, payload);
        Ok(())
    }
}
