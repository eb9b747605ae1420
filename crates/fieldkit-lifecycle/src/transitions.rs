//! The requisition status graph.
//!
//! draft -> pending -> {approved, rejected}; approved -> in-transit ->
//! delivered -> finalized; any -> historical-manual. No exit from
//! finalized, rejected, or historical-manual in normal operation.

use fieldkit_core::models::RequisitionStatus;

/// Whether `(from, to)` is an edge of the lifecycle graph.
///
/// `HistoricalManual` is reachable from every status as an administrative
/// override.
pub fn is_transition_allowed(from: RequisitionStatus, to: RequisitionStatus) -> bool {
    use RequisitionStatus::*;
    if to == HistoricalManual {
        return true;
    }
    matches!(
        (from, to),
        (Draft, Pending)
            | (Pending, Approved)
            | (Pending, Rejected)
            | (Approved, InTransit)
            | (InTransit, Delivered)
            | (Delivered, Finalized)
    )
}

/// Whether a status participates in active-pipeline aggregates.
///
/// Draft has not entered the pipeline; rejected, finalized, and the
/// historical-manual override are out of it.
pub fn is_active_pipeline(status: RequisitionStatus) -> bool {
    use RequisitionStatus::*;
    matches!(status, Pending | Approved | InTransit | Delivered)
}
