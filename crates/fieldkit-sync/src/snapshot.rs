//! Snapshot reconciliation for cross-session bootstrap.
//!
//! Whole-snapshot precedence is last-write-wins with remote winning ties to
//! favor convergence. The user collection gets an element-level merge so a
//! blanket remote-wins pass cannot silently drop an account created on a
//! session the remote snapshot predates.

use std::collections::HashMap;

use fieldkit_core::models::{StateSnapshot, UserAccount};

/// Which side a snapshot resolution chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSide {
    Local,
    Remote,
}

/// Result of [`resolve_snapshot`].
#[derive(Debug, Clone, Copy)]
pub struct SnapshotResolution<'a> {
    pub chosen: &'a StateSnapshot,
    pub side: SnapshotSide,
}

impl SnapshotResolution<'_> {
    /// When the local snapshot won, the remote is stale and the caller is
    /// expected to push the chosen snapshot back up so no local session's
    /// unsynced edits are dropped permanently.
    pub fn needs_push_back(&self) -> bool {
        self.side == SnapshotSide::Local
    }
}

/// Choose between a local and a remote snapshot by `updated_at`.
///
/// Pure comparison: remote wins when `remote.updated_at >= local.updated_at`.
pub fn resolve_snapshot<'a>(
    local: &'a StateSnapshot,
    remote: &'a StateSnapshot,
) -> SnapshotResolution<'a> {
    if remote.updated_at >= local.updated_at {
        SnapshotResolution {
            chosen: remote,
            side: SnapshotSide::Remote,
        }
    } else {
        SnapshotResolution {
            chosen: local,
            side: SnapshotSide::Local,
        }
    }
}

/// Result of [`merge_users`].
#[derive(Debug, Clone)]
pub struct UserMerge {
    pub merged: Vec<UserAccount>,
    /// True when the merged result differs from the raw remote set by
    /// cardinality or any per-id `updated_at`, so the caller can decide to
    /// push the reconciled set back.
    pub differs_from_remote: bool,
}

/// Element-level merge of the user collection.
///
/// Starts from `remote`; a local account absent from remote is kept
/// (created offline or on a session that has not synced yet), and an
/// account present on both sides keeps whichever side has the greater
/// `updated_at`, remote winning ties.
pub fn merge_users(local: &[UserAccount], remote: &[UserAccount]) -> UserMerge {
    let mut merged: Vec<UserAccount> = remote.to_vec();
    let index: HashMap<&str, usize> = remote
        .iter()
        .enumerate()
        .map(|(i, u)| (u.id.as_str(), i))
        .collect();

    for account in local {
        match index.get(account.id.as_str()) {
            None => merged.push(account.clone()),
            Some(&i) => {
                if account.updated_at > merged[i].updated_at {
                    merged[i] = account.clone();
                }
            }
        }
    }

    // Remote order is preserved for the overlapping prefix, so a pairwise
    // scan catches every per-id timestamp difference.
    let differs_from_remote = merged.len() != remote.len()
        || merged
            .iter()
            .zip(remote.iter())
            .any(|(m, r)| m.id != r.id || m.updated_at != r.updated_at);

    UserMerge {
        merged,
        differs_from_remote,
    }
}
