//! # fieldkit-sync
//!
//! The sync orchestrator and the snapshot merge module.
//!
//! The orchestrator serializes and coalesces synchronization attempts, pulls
//! authoritative collection values into the working cache, and re-arms push
//! subscriptions. The snapshot module reconciles consolidated bootstrap
//! snapshots with timestamp precedence and an element-level merge for the
//! user collection.

pub mod orchestrator;
pub mod snapshot;

pub use orchestrator::{SyncFailure, SyncOrchestrator, SyncOutcome, SyncReport};
pub use snapshot::{merge_users, resolve_snapshot, SnapshotResolution, SnapshotSide, UserMerge};
