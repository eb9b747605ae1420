//! # fieldkit-lifecycle
//!
//! The requisition lifecycle engine: owns the state machine, the
//! optimistic-concurrency contract, and the append-only audit/timeline
//! recording for requisition entities. Every mutation goes through here;
//! nothing pokes entity fields past the version increment.

pub mod engine;
pub mod sequence;
pub mod transitions;

pub use engine::{BatchOutcome, LifecycleEngine, TransitionExtra};
pub use sequence::next_sequence_number;
pub use transitions::{is_active_pipeline, is_transition_allowed};
