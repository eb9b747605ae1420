//! Property tests for the user-collection element merge.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use fieldkit_core::models::UserAccount;
use fieldkit_sync::merge_users;

/// Build accounts from `(id, timestamp)` pairs, first occurrence of an id wins.
fn accounts(raw: Vec<(u8, i64)>) -> Vec<UserAccount> {
    let mut seen = std::collections::HashSet::new();
    raw.into_iter()
        .filter(|(id, _)| seen.insert(*id))
        .map(|(id, ts)| UserAccount {
            id: format!("u{id}"),
            login_name: format!("u{id}"),
            display_name: format!("U{id}"),
            role: "technician".to_string(),
            active: true,
            updated_at: Utc.timestamp_opt(ts, 0).unwrap(),
        })
        .collect()
}

fn side() -> impl Strategy<Value = Vec<(u8, i64)>> {
    prop::collection::vec((0u8..16, 0i64..500), 0..12)
}

proptest! {
    /// Any account present locally and absent from remote survives the merge.
    #[test]
    fn merge_never_drops_a_local_account(local_raw in side(), remote_raw in side()) {
        let local = accounts(local_raw);
        let remote = accounts(remote_raw);
        let merge = merge_users(&local, &remote);

        for account in &local {
            prop_assert!(
                merge.merged.iter().any(|m| m.id == account.id),
                "local account {} was dropped",
                account.id
            );
        }
        for account in &remote {
            prop_assert!(merge.merged.iter().any(|m| m.id == account.id));
        }
    }

    /// Per id, the merged element carries the greater timestamp; on a tie
    /// the remote element is kept.
    #[test]
    fn merged_element_is_the_last_writer(local_raw in side(), remote_raw in side()) {
        let local = accounts(local_raw);
        let remote = accounts(remote_raw);
        let merge = merge_users(&local, &remote);

        let mut ids = std::collections::HashSet::new();
        for m in &merge.merged {
            prop_assert!(ids.insert(m.id.clone()), "duplicate id {} in merge", m.id);
            let local_ts = local.iter().find(|u| u.id == m.id).map(|u| u.updated_at);
            let remote_ts = remote.iter().find(|u| u.id == m.id).map(|u| u.updated_at);
            let expected = local_ts.max(remote_ts).unwrap();
            prop_assert_eq!(m.updated_at, expected);
        }
    }

    /// The divergence flag is exact: unset only when the merge is the raw
    /// remote set element for element.
    #[test]
    fn divergence_flag_matches_reality(local_raw in side(), remote_raw in side()) {
        let local = accounts(local_raw);
        let remote = accounts(remote_raw);
        let merge = merge_users(&local, &remote);

        let same = merge.merged.len() == remote.len()
            && merge
                .merged
                .iter()
                .zip(remote.iter())
                .all(|(m, r)| m.id == r.id && m.updated_at == r.updated_at);
        prop_assert_eq!(!merge.differs_from_remote, same);
    }
}
