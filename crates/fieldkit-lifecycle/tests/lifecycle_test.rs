use std::sync::Arc;

use fieldkit_cache::WorkingCache;
use fieldkit_core::config::SyncConfig;
use fieldkit_core::errors::{AccountError, FieldkitError, LifecycleError, SyncError};
use fieldkit_core::models::{Collection, Requisition, RequisitionStatus, TimelineEvent};
use fieldkit_lifecycle::{LifecycleEngine, TransitionExtra};
use rust_decimal::Decimal;
use test_fixtures::{at, draft, line_item, user_at, MockRemote};

fn setup() -> (Arc<WorkingCache>, Arc<MockRemote>, LifecycleEngine<MockRemote>) {
    let cache = Arc::new(WorkingCache::new());
    let remote = Arc::new(MockRemote::new());
    let engine = LifecycleEngine::new(
        Arc::clone(&cache),
        Arc::clone(&remote),
        SyncConfig::default(),
        "session-a",
    );
    (cache, remote, engine)
}

fn money(s: &str) -> Decimal {
    s.parse().unwrap()
}

// ── Creation: Scenario A ──────────────────────────────────────────────────

#[tokio::test]
async fn creation_computes_totals_and_seeds_audit() {
    let (cache, remote, engine) = setup();
    let mut d = draft("kim", vec![line_item("P1", 2, "10.00"), line_item("P2", 1, "5.00")]);
    d.discount = money("5");
    d.freight = money("2");

    let req = engine.create_requisition(d, "kim").await.unwrap();

    assert_eq!(req.subtotal, money("25.00"));
    assert_eq!(req.total, money("22.00"));
    assert_eq!(req.audit.version, 1);
    assert_eq!(req.status, RequisitionStatus::Draft);
    assert_eq!(req.timeline.len(), 1, "timeline seeded with one created event");
    assert_eq!(req.timeline[0].event, TimelineEvent::Created);
    assert!(req.approvals.is_empty());

    // Persisted remotely and applied to the cache only after the ack.
    let stored = cache.requisitions().unwrap().unwrap();
    assert_eq!(stored.len(), 1);
    assert!(remote
        .envelope(fieldkit_core::models::Collection::Requisitions)
        .is_some());
}

#[tokio::test]
async fn invalid_line_items_are_rejected_at_creation() {
    let (_, _, engine) = setup();
    let err = engine
        .create_requisition(draft("kim", vec![line_item("P1", 0, "1.00")]), "kim")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FieldkitError::Lifecycle(LifecycleError::InvalidLineItem { .. })
    ));
}

// ── Sequence numbers: Scenario C ──────────────────────────────────────────

#[tokio::test]
async fn sequence_numbers_increase_and_never_reuse() {
    let (_, _, engine) = setup();
    let mut last = String::new();
    for _ in 0..4 {
        let req = engine
            .create_requisition(draft("kim", vec![line_item("P1", 1, "1.00")]), "kim")
            .await
            .unwrap();
        last = req.sequence_number.clone();
    }
    assert!(last.ends_with("-0004"), "got {last}");

    let req = engine
        .create_requisition(draft("kim", vec![line_item("P1", 1, "1.00")]), "kim")
        .await
        .unwrap();
    assert!(req.sequence_number.ends_with("-0005"), "got {}", req.sequence_number);
}

#[tokio::test]
async fn deleting_the_latest_draft_does_not_free_its_number() {
    let (_, _, engine) = setup();
    let first = engine
        .create_requisition(draft("kim", vec![line_item("P1", 1, "1.00")]), "kim")
        .await
        .unwrap();
    let second = engine
        .create_requisition(draft("kim", vec![line_item("P1", 1, "1.00")]), "kim")
        .await
        .unwrap();
    assert!(second.sequence_number.ends_with("-0002"));

    engine.delete_requisition(&second.id).await.unwrap();
    let third = engine
        .create_requisition(draft("kim", vec![line_item("P1", 1, "1.00")]), "kim")
        .await
        .unwrap();
    assert!(
        third.sequence_number.ends_with("-0003"),
        "0002 must not be reused, got {}",
        third.sequence_number
    );
    assert_ne!(first.sequence_number, third.sequence_number);
}

// ── Optimistic concurrency: Scenario B ────────────────────────────────────

#[tokio::test]
async fn stale_version_is_rejected_then_retry_succeeds() {
    let (cache, _, engine) = setup();
    let req = engine
        .create_requisition(draft("kim", vec![line_item("P1", 1, "8.00")]), "kim")
        .await
        .unwrap();
    let req = engine.save(req, "kim").await.unwrap(); // v2
    let req = engine
        .apply_transition(&req.id, RequisitionStatus::Pending, "kim", TransitionExtra::default())
        .await
        .unwrap(); // v3
    assert_eq!(req.audit.version, 3);

    // Session B loads a copy at version 3.
    let mut b_copy = req.clone();

    // Session A approves: version 4.
    let approved = engine
        .apply_transition(&req.id, RequisitionStatus::Approved, "mgr", TransitionExtra::default())
        .await
        .unwrap();
    assert_eq!(approved.audit.version, 4);

    // Session B submits a quantity edit still carrying version 3.
    b_copy.line_items[0].quantity = 5;
    let err = engine.save(b_copy, "lee").await.unwrap_err();
    match err {
        FieldkitError::Lifecycle(LifecycleError::VersionConflict { submitted, stored, .. }) => {
            assert_eq!(submitted, 3);
            assert_eq!(stored, 4);
        }
        other => panic!("expected version conflict, got {other}"),
    }

    // Stored state was not mutated by the rejected write.
    let current = cache.requisitions().unwrap().unwrap();
    assert_eq!(current[0].audit.version, 4);
    assert_eq!(current[0].line_items[0].quantity, 1);
    assert_eq!(current[0].status, RequisitionStatus::Approved);

    // B re-reads and retries: accepted at version 5.
    let mut fresh = current[0].clone();
    fresh.line_items[0].quantity = 5;
    let saved = engine.save(fresh, "lee").await.unwrap();
    assert_eq!(saved.audit.version, 5);
    assert_eq!(saved.status, RequisitionStatus::Approved);
    assert_eq!(saved.audit.last_updated_by, "lee", "save must stamp the acting user");
}

#[tokio::test]
async fn versions_are_gapless_over_successive_saves() {
    let (_, _, engine) = setup();
    let mut req = engine
        .create_requisition(draft("kim", vec![line_item("P1", 1, "8.00")]), "kim")
        .await
        .unwrap();
    for expected in 2..=6u64 {
        req.notes = Some(format!("edit {expected}"));
        req = engine.save(req, "kim").await.unwrap();
        assert_eq!(req.audit.version, expected);
    }
}

// ── Transition graph ──────────────────────────────────────────────────────

#[tokio::test]
async fn illegal_edges_are_rejected_without_mutation() {
    let (cache, _, engine) = setup();
    let req = engine
        .create_requisition(draft("kim", vec![line_item("P1", 1, "8.00")]), "kim")
        .await
        .unwrap();

    let err = engine
        .apply_transition(&req.id, RequisitionStatus::Approved, "mgr", TransitionExtra::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FieldkitError::Lifecycle(LifecycleError::InvalidTransition { .. })
    ));

    let stored = &cache.requisitions().unwrap().unwrap()[0];
    assert_eq!(stored.status, RequisitionStatus::Draft);
    assert_eq!(stored.audit.version, 1, "rejected transition must not bump the version");
    assert_eq!(stored.timeline.len(), 1);
}

#[tokio::test]
async fn historical_manual_is_reachable_from_any_status_and_hidden_from_queues() {
    let (_, _, engine) = setup();
    let req = engine
        .create_requisition(draft("kim", vec![line_item("P1", 1, "8.00")]), "kim")
        .await
        .unwrap();
    engine
        .apply_transition(&req.id, RequisitionStatus::Pending, "kim", TransitionExtra::default())
        .await
        .unwrap();
    assert_eq!(engine.pending_queue().unwrap().len(), 1);

    let archived = engine
        .apply_transition(
            &req.id,
            RequisitionStatus::HistoricalManual,
            "admin",
            TransitionExtra::default(),
        )
        .await
        .unwrap();
    assert_eq!(archived.status, RequisitionStatus::HistoricalManual);
    assert!(engine.pending_queue().unwrap().is_empty());
    assert!(engine.active_pipeline().unwrap().is_empty());
}

#[tokio::test]
async fn full_fulfillment_path_appends_timeline_and_approvals() {
    let (_, _, engine) = setup();
    let req = engine
        .create_requisition(draft("kim", vec![line_item("P1", 1, "8.00")]), "kim")
        .await
        .unwrap();
    let req = engine
        .apply_transition(&req.id, RequisitionStatus::Pending, "kim", TransitionExtra::default())
        .await
        .unwrap();
    let req = engine
        .apply_transition(
            &req.id,
            RequisitionStatus::Approved,
            "mgr",
            TransitionExtra {
                supplier: Some("acme".to_string()),
                comment: Some("go ahead".to_string()),
                ..TransitionExtra::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(req.supplier.as_deref(), Some("acme"));
    assert_eq!(req.approvals.len(), 1);
    assert_eq!(req.approvals[0].by, "mgr");
    assert_eq!(req.approvals[0].comment.as_deref(), Some("go ahead"));

    let req = engine
        .apply_transition(
            &req.id,
            RequisitionStatus::InTransit,
            "mgr",
            TransitionExtra {
                tracking_code: Some("TRK-1".to_string()),
                ..TransitionExtra::default()
            },
        )
        .await
        .unwrap();
    let req = engine
        .apply_transition(&req.id, RequisitionStatus::Delivered, "kim", TransitionExtra::default())
        .await
        .unwrap();
    let req = engine
        .apply_transition(&req.id, RequisitionStatus::Finalized, "mgr", TransitionExtra::default())
        .await
        .unwrap();

    assert_eq!(req.tracking_code.as_deref(), Some("TRK-1"));
    assert_eq!(req.audit.version, 6, "one increment per accepted mutation");
    // created + 5 status changes, in order, never truncated.
    assert_eq!(req.timeline.len(), 6);
    assert_eq!(req.timeline[0].event, TimelineEvent::Created);
    assert!(req.timeline[1..]
        .iter()
        .all(|e| e.event == TimelineEvent::StatusChanged));
    // Only the approve decision landed in approvals.
    assert_eq!(req.approvals.len(), 1);
}

// ── Line item precondition ────────────────────────────────────────────────

#[tokio::test]
async fn empty_requisition_cannot_enter_the_pipeline() {
    let (cache, _, engine) = setup();
    let req = engine
        .create_requisition(draft("kim", vec![]), "kim")
        .await
        .unwrap();

    // Drafting empty is fine; submitting empty is not.
    let err = engine
        .apply_transition(&req.id, RequisitionStatus::Pending, "kim", TransitionExtra::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FieldkitError::Lifecycle(LifecycleError::EmptyRequisition { .. })
    ));

    let stored = &cache.requisitions().unwrap().unwrap()[0];
    assert_eq!(stored.status, RequisitionStatus::Draft, "status unchanged");
    assert_eq!(stored.audit.version, 1);
    assert_eq!(stored.timeline.len(), 1);

    // Adding an item unblocks the submission.
    let mut filled = stored.clone();
    filled.line_items.push(line_item("P1", 1, "3.00"));
    let filled = engine.save(filled, "kim").await.unwrap();
    let submitted = engine
        .apply_transition(&filled.id, RequisitionStatus::Pending, "kim", TransitionExtra::default())
        .await
        .unwrap();
    assert_eq!(submitted.status, RequisitionStatus::Pending);
}

// ── Batch approval ────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_approval_is_partial_success() {
    let (_, _, engine) = setup();
    let mut ids = Vec::new();
    for _ in 0..2 {
        let req = engine
            .create_requisition(draft("kim", vec![line_item("P1", 1, "8.00")]), "kim")
            .await
            .unwrap();
        let req = engine
            .apply_transition(&req.id, RequisitionStatus::Pending, "kim", TransitionExtra::default())
            .await
            .unwrap();
        ids.push(req.id);
    }
    // Still a draft: not approvable.
    let stuck = engine
        .create_requisition(draft("kim", vec![line_item("P1", 1, "8.00")]), "kim")
        .await
        .unwrap();
    ids.push(stuck.id.clone());

    let outcome = engine.approve_batch(&ids, "mgr", None).await;
    assert_eq!(outcome.succeeded, 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].0, stuck.id);

    // The failure did not roll back the successes.
    let approved = engine
        .active_pipeline()
        .unwrap()
        .into_iter()
        .filter(|r| r.status == RequisitionStatus::Approved)
        .count();
    assert_eq!(approved, 2);
}

// ── Deletion rules ────────────────────────────────────────────────────────

#[tokio::test]
async fn only_history_free_drafts_can_be_deleted() {
    let (_, _, engine) = setup();
    let kept = engine
        .create_requisition(draft("kim", vec![line_item("P1", 1, "8.00")]), "kim")
        .await
        .unwrap();
    engine
        .apply_transition(&kept.id, RequisitionStatus::Pending, "kim", TransitionExtra::default())
        .await
        .unwrap();

    let err = engine.delete_requisition(&kept.id).await.unwrap_err();
    assert!(matches!(
        err,
        FieldkitError::Lifecycle(LifecycleError::DeleteForbidden { .. })
    ));

    let gone = engine
        .create_requisition(draft("kim", vec![line_item("P1", 1, "8.00")]), "kim")
        .await
        .unwrap();
    engine.delete_requisition(&gone.id).await.unwrap();
    let err = engine.delete_requisition(&gone.id).await.unwrap_err();
    assert!(matches!(
        err,
        FieldkitError::Lifecycle(LifecycleError::NotFound { .. })
    ));
}

// ── User accounts ─────────────────────────────────────────────────────────

#[tokio::test]
async fn colliding_login_names_are_rejected() {
    let (_, _, engine) = setup();
    engine.save_user(user_at("jose", at(10))).await.unwrap();

    let mut dup = user_at("other-id", at(20));
    dup.login_name = "José".to_string();
    let err = engine.save_user(dup).await.unwrap_err();
    assert!(matches!(
        err,
        FieldkitError::Account(AccountError::DuplicateSecondaryKey { .. })
    ));

    // Updating the same account under its own login is fine.
    let mut same = user_at("jose", at(30));
    same.display_name = "José L.".to_string();
    engine.save_user(same).await.unwrap();
}

// ── Pre-hydration writes ──────────────────────────────────────────────────

#[tokio::test]
async fn fresh_session_create_preserves_other_sessions_requisitions() {
    let (_, remote, engine_a) = setup();
    let first = engine_a
        .create_requisition(draft("kim", vec![line_item("P1", 1, "8.00")]), "kim")
        .await
        .unwrap();

    // A second session whose cache has never hydrated writes immediately.
    let cache_b = Arc::new(WorkingCache::new());
    let engine_b = LifecycleEngine::new(
        Arc::clone(&cache_b),
        Arc::clone(&remote),
        SyncConfig::default(),
        "session-b",
    );
    assert!(!cache_b.is_hydrated(Collection::Requisitions));
    let second = engine_b
        .create_requisition(draft("lee", vec![line_item("P2", 1, "4.00")]), "lee")
        .await
        .unwrap();

    // The remote list carries both; numbering continued instead of restarting.
    assert!(second.sequence_number.ends_with("-0002"), "got {}", second.sequence_number);
    let envelope = remote.envelope(Collection::Requisitions).unwrap();
    let stored: Vec<Requisition> = serde_json::from_value(envelope.payload).unwrap();
    assert_eq!(stored.len(), 2);
    assert!(
        stored.iter().any(|r| r.id == first.id),
        "the other session's requisition must survive"
    );
}

#[tokio::test]
async fn fresh_session_save_user_preserves_the_remote_directory() {
    let (_, remote, engine_a) = setup();
    engine_a.save_user(user_at("jose", at(10))).await.unwrap();

    let engine_b = LifecycleEngine::new(
        Arc::new(WorkingCache::new()),
        Arc::clone(&remote),
        SyncConfig::default(),
        "session-b",
    );
    engine_b.save_user(user_at("ana", at(20))).await.unwrap();

    let envelope = remote.envelope(Collection::Users).unwrap();
    let stored: Vec<fieldkit_core::models::UserAccount> =
        serde_json::from_value(envelope.payload).unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().any(|u| u.id == "jose"));
}

// ── Write path failure semantics ──────────────────────────────────────────

#[tokio::test]
async fn writes_fail_closed_when_disconnected() {
    let (cache, remote, engine) = setup();
    remote.set_connected(false);

    let err = engine
        .create_requisition(draft("kim", vec![line_item("P1", 1, "8.00")]), "kim")
        .await
        .unwrap_err();
    assert!(matches!(err, FieldkitError::Sync(SyncError::NotConnected)));
    assert!(
        cache.requisitions().unwrap().is_none(),
        "cache must not show an unacknowledged write"
    );
}

#[tokio::test]
async fn rejected_remote_write_leaves_cache_untouched() {
    let (cache, remote, engine) = setup();
    let req = engine
        .create_requisition(draft("kim", vec![line_item("P1", 1, "8.00")]), "kim")
        .await
        .unwrap();

    remote.fail_sets(true);
    let err = engine
        .apply_transition(&req.id, RequisitionStatus::Pending, "kim", TransitionExtra::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FieldkitError::Sync(SyncError::Transport { .. })
    ));

    let stored = &cache.requisitions().unwrap().unwrap()[0];
    assert_eq!(stored.status, RequisitionStatus::Draft);
    assert_eq!(stored.audit.version, 1);
}
