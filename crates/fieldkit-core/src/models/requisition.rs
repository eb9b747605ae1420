//! The requisition, the most contended entity in the system.
//!
//! Mutations go through the lifecycle engine only; `audit.version` increments
//! by exactly one on every accepted mutation, and `timeline` / `approvals`
//! are append-only.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::CURRENCY_SCALE;
use crate::errors::LifecycleError;

/// Lifecycle states of a requisition.
///
/// `HistoricalManual` is an administrative override reachable from any
/// status; it is excluded from active-pipeline aggregates and from the
/// pending-approval queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequisitionStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    InTransit,
    Delivered,
    Finalized,
    HistoricalManual,
}

impl std::fmt::Display for RequisitionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RequisitionStatus::Draft => "draft",
            RequisitionStatus::Pending => "pending",
            RequisitionStatus::Approved => "approved",
            RequisitionStatus::Rejected => "rejected",
            RequisitionStatus::InTransit => "in-transit",
            RequisitionStatus::Delivered => "delivered",
            RequisitionStatus::Finalized => "finalized",
            RequisitionStatus::HistoricalManual => "historical-manual",
        };
        f.write_str(s)
    }
}

/// One ordered line of a requisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Part code.
    pub code: String,
    pub description: String,
    /// Must be strictly positive.
    pub quantity: u32,
    /// Must be non-negative.
    pub unit_price: Decimal,
}

impl LineItem {
    /// Quantity times unit price, rounded to currency scale.
    pub fn line_total(&self) -> Decimal {
        (self.unit_price * Decimal::from(self.quantity)).round_dp(CURRENCY_SCALE)
    }

    /// Check the quantity and price constraints.
    pub fn validate(&self) -> Result<(), LifecycleError> {
        if self.quantity == 0 {
            return Err(LifecycleError::InvalidLineItem {
                reason: format!("quantity must be positive for part {}", self.code),
            });
        }
        if self.unit_price.is_sign_negative() {
            return Err(LifecycleError::InvalidLineItem {
                reason: format!("unit price must be non-negative for part {}", self.code),
            });
        }
        Ok(())
    }
}

/// Write metadata carried by every requisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditInfo {
    /// Strictly monotonic, gapless, starts at 1.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub last_updated_at: DateTime<Utc>,
    pub last_updated_by: String,
}

/// Kinds of lifecycle events recorded on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEvent {
    Created,
    StatusChanged,
}

/// One append-only timeline record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub event: TimelineEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<RequisitionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<RequisitionStatus>,
    pub at: DateTime<Utc>,
    pub by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// An approve/reject decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

/// One append-only approvals record. Only approve/reject decisions land here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalEntry {
    pub decision: ApprovalDecision,
    pub at: DateTime<Utc>,
    pub by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// A parts requisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requisition {
    /// Immutable, assigned at creation.
    pub id: String,
    /// Human-facing, date-prefixed, assigned once at creation.
    pub sequence_number: String,
    pub status: RequisitionStatus,
    /// Name of the requesting technician.
    pub technician: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub line_items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub freight: Decimal,
    pub total: Decimal,
    pub audit: AuditInfo,
    pub timeline: Vec<TimelineEntry>,
    pub approvals: Vec<ApprovalEntry>,
}

impl Requisition {
    /// Recompute `subtotal` and `total` from the line items.
    ///
    /// `total = subtotal - discount + freight`, everything rounded to
    /// currency scale. The only sanctioned way to update the money fields.
    pub fn recompute_totals(&mut self) {
        self.subtotal = self
            .line_items
            .iter()
            .map(LineItem::line_total)
            .sum::<Decimal>()
            .round_dp(CURRENCY_SCALE);
        self.discount = self.discount.round_dp(CURRENCY_SCALE);
        self.freight = self.freight.round_dp(CURRENCY_SCALE);
        self.total = (self.subtotal - self.discount + self.freight).round_dp(CURRENCY_SCALE);
    }

    pub fn has_line_items(&self) -> bool {
        !self.line_items.is_empty()
    }
}

/// Caller-supplied fields for creating a requisition. Everything else
/// (id, sequence number, audit, timeline) is assigned by the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequisitionDraft {
    pub technician: String,
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub freight: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
