//! # fieldkit-cache
//!
//! The Local Working Cache: an in-process mapping of collection name to
//! current value, authoritative for all reads during a session. Never
//! persisted; a new session starts empty and hydrates through the sync
//! orchestrator. A read of `None` means "not yet loaded", not
//! "confirmed empty".

mod working_cache;

pub use working_cache::{ObserverId, WorkingCache};
