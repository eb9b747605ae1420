//! # fieldkit-remote
//!
//! The contract with the Remote Synchronization Service: one envelope per
//! named collection, get/set per key, push-based change delivery, and
//! observable connectivity. The service itself is an external collaborator;
//! this crate only defines the seam the rest of the workspace talks through.

pub mod protocol;
pub mod store;

pub use protocol::CollectionEnvelope;
pub use store::{bounded, ChangeHandler, ConnectionListener, RemoteStore};
