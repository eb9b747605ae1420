/// Requisition lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("version conflict on requisition {id}: submitted {submitted}, stored {stored}")]
    VersionConflict {
        id: String,
        submitted: u64,
        stored: u64,
    },

    #[error("invalid transition on requisition {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: String,
        to: String,
    },

    #[error("requisition {id} has no line items and cannot be approved")]
    EmptyRequisition { id: String },

    #[error("requisition {id} not found")]
    NotFound { id: String },

    #[error("requisition {id} in status {status} cannot be deleted")]
    DeleteForbidden { id: String, status: String },

    #[error("invalid line item: {reason}")]
    InvalidLineItem { reason: String },

    #[error("invalid amount: {reason}")]
    InvalidAmount { reason: String },
}
