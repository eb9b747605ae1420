//! # fieldkit-core
//!
//! Foundation crate for the Fieldkit synchronized state layer.
//! Defines all types, errors, config, and constants.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod models;

// Re-export the most commonly used types at the crate root.
pub use config::SyncConfig;
pub use errors::{FieldkitError, FieldkitResult};
pub use models::{
    ApprovalDecision, ApprovalEntry, AuditInfo, Collection, LineItem, Requisition,
    RequisitionDraft, RequisitionStatus, StateSnapshot, TimelineEntry, TimelineEvent, UserAccount,
};
