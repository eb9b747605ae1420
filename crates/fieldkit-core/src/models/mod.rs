//! Data model for the synchronized collections.

mod collection;
mod directory;
mod requisition;
mod snapshot;
mod user;

pub use collection::Collection;
pub use directory::{Part, Supplier, Technician};
pub use requisition::{
    ApprovalDecision, ApprovalEntry, AuditInfo, LineItem, Requisition, RequisitionDraft,
    RequisitionStatus, TimelineEntry, TimelineEvent,
};
pub use snapshot::StateSnapshot;
pub use user::UserAccount;
