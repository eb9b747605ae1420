//! Human-facing sequence numbers: `REQ-YYYYMMDD-NNNN`.
//!
//! Monotonically increasing within a date prefix, assigned once at creation,
//! never reassigned.

use chrono::NaiveDate;

use fieldkit_core::constants::{SEQUENCE_PAD, SEQUENCE_PREFIX};
use fieldkit_core::models::Requisition;

/// Date prefix for a sequence number, without the counter.
pub fn sequence_prefix(date: NaiveDate) -> String {
    format!("{SEQUENCE_PREFIX}-{}", date.format("%Y%m%d"))
}

/// Next sequence number under `date`'s prefix.
///
/// `floor` is the engine's high-water mark for the prefix; passing the
/// highest counter ever handed out keeps numbers from being reused even
/// when the requisition that held the maximum was deleted.
pub fn next_sequence_number(existing: &[Requisition], date: NaiveDate, floor: u64) -> String {
    let prefix = sequence_prefix(date);
    let max_existing = existing
        .iter()
        .filter_map(|r| r.sequence_number.strip_prefix(&prefix))
        .filter_map(|rest| rest.strip_prefix('-'))
        .filter_map(|counter| counter.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    let next = max_existing.max(floor) + 1;
    format!("{prefix}-{next:0width$}", width = SEQUENCE_PAD)
}

/// The counter portion of a sequence number, if it carries this prefix.
pub fn counter_under_prefix(sequence_number: &str, prefix: &str) -> Option<u64> {
    sequence_number
        .strip_prefix(prefix)?
        .strip_prefix('-')?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn with_sequences(numbers: &[&str]) -> Vec<Requisition> {
        numbers
            .iter()
            .map(|n| {
                let raw = serde_json::json!({
                    "id": n,
                    "sequence_number": n,
                    "status": "draft",
                    "technician": "t",
                    "line_items": [],
                    "subtotal": "0",
                    "discount": "0",
                    "freight": "0",
                    "total": "0",
                    "audit": {
                        "version": 1,
                        "created_at": "2025-06-01T00:00:00Z",
                        "created_by": "t",
                        "last_updated_at": "2025-06-01T00:00:00Z",
                        "last_updated_by": "t"
                    },
                    "timeline": [],
                    "approvals": []
                });
                serde_json::from_value(raw).unwrap()
            })
            .collect()
    }

    #[test]
    fn fifth_of_the_day_gets_0005() {
        let existing = with_sequences(&[
            "REQ-20250601-0001",
            "REQ-20250601-0002",
            "REQ-20250601-0003",
            "REQ-20250601-0004",
        ]);
        assert_eq!(
            next_sequence_number(&existing, date(), 0),
            "REQ-20250601-0005"
        );
    }

    #[test]
    fn other_dates_do_not_count() {
        let existing = with_sequences(&["REQ-20250531-0009"]);
        assert_eq!(
            next_sequence_number(&existing, date(), 0),
            "REQ-20250601-0001"
        );
    }

    #[test]
    fn floor_prevents_reuse_after_deletion() {
        // 0004 was handed out and then deleted; the floor remembers it.
        let existing = with_sequences(&["REQ-20250601-0003"]);
        assert_eq!(
            next_sequence_number(&existing, date(), 4),
            "REQ-20250601-0005"
        );
    }

    #[test]
    fn counter_parse_ignores_foreign_prefixes() {
        assert_eq!(
            counter_under_prefix("REQ-20250601-0042", "REQ-20250601"),
            Some(42)
        );
        assert_eq!(counter_under_prefix("REQ-20250531-0042", "REQ-20250601"), None);
    }
}
