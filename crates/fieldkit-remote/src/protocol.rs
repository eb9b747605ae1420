//! Wire types for the remote shared store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the remote store holds per named collection: the full collection
/// payload plus last-write metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionEnvelope {
    /// The complete, self-consistent collection value. Collections are
    /// replaced wholesale; there are no partial-field remote updates.
    pub payload: serde_json::Value,
    /// When this version was written.
    pub updated_at: DateTime<Utc>,
    /// Session identity of the writer, used for delivery loop prevention.
    pub writer_id: String,
}

impl CollectionEnvelope {
    /// Envelope for a payload written by `writer_id` right now.
    pub fn now(payload: serde_json::Value, writer_id: impl Into<String>) -> Self {
        Self {
            payload,
            updated_at: Utc::now(),
            writer_id: writer_id.into(),
        }
    }
}
