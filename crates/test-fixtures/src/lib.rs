//! Shared test support: an in-memory `RemoteStore` with fault injection,
//! plus entity builders used across the workspace's integration tests.

mod mock_remote;

pub use mock_remote::MockRemote;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use fieldkit_core::models::{LineItem, RequisitionDraft, UserAccount};

/// Timestamp helper: seconds since the epoch.
pub fn at(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).unwrap()
}

/// A line item with the given quantity and unit price (decimal string).
pub fn line_item(code: &str, quantity: u32, unit_price: &str) -> LineItem {
    LineItem {
        code: code.to_string(),
        description: format!("part {code}"),
        quantity,
        unit_price: unit_price.parse::<Decimal>().expect("valid test price"),
    }
}

/// A requisition draft for `technician` carrying the given items.
pub fn draft(technician: &str, items: Vec<LineItem>) -> RequisitionDraft {
    RequisitionDraft {
        technician: technician.to_string(),
        line_items: items,
        discount: Decimal::ZERO,
        freight: Decimal::ZERO,
        notes: None,
    }
}

/// A user account whose id doubles as the login name.
pub fn user_at(id: &str, updated_at: DateTime<Utc>) -> UserAccount {
    UserAccount {
        id: id.to_string(),
        login_name: id.to_string(),
        display_name: id.to_uppercase(),
        role: "technician".to_string(),
        active: true,
        updated_at,
    }
}
